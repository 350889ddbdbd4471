use crate::world::SocialGridWorld;

/// Text rendering for debugging: `A` agent, `G` goal, `N` NPC.
pub fn render(world: &SocialGridWorld) -> String {
    let Some(state) = world.state() else {
        return "Environment not initialized. Call reset().".to_string();
    };

    let size = world.config().grid_size as usize;
    let mut grid = vec![vec!["."; size]; size];

    // Later writes win: the agent is drawn over the NPC in contact mode.
    let glyphs = [
        (state.goal_pos, "G"),
        (state.npc_pos, "N"),
        (state.agent_pos, "A"),
    ];
    for (pos, glyph) in glyphs {
        grid[pos.y as usize][pos.x as usize] = glyph;
    }

    let rows: Vec<String> = grid.iter().map(|row| row.join(" ")).collect();

    let mut mood_line = format!("NPC: {}", world.mood().label());
    if let Some(estimate) = state.npc_mood_estimate {
        mood_line.push_str(&format!(" (Agent believes: {})", estimate.label()));
    }

    format!("{}\n{}\nSteps: {}", rows.join("\n"), mood_line, state.steps)
}
