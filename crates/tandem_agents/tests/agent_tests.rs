//! Agent behaviour against the real environment.

use proptest::prelude::*;
use tandem_agents::{
    build_agent, run_episode, run_episode_with, Agent, AgentParams, FixedIntegrationAgent,
    ValueTableView,
};
use tandem_core::{
    AgentKind, Domain, EnvironmentConfig, IntegrationWeights, Mood, StepEvent, TandemConfig,
};
use tandem_env::SocialGridWorld;

fn env(mood: Mood) -> SocialGridWorld {
    SocialGridWorld::new(
        EnvironmentConfig {
            initial_mood: mood,
            ..Default::default()
        },
        7,
    )
    .unwrap()
}

#[test]
fn callback_sees_every_step() {
    let cfg = TandemConfig::default();
    let mut world = env(Mood::Neutral);
    let mut agent = build_agent(AgentKind::Arousal, &cfg, 3).unwrap();

    let mut seen = 0u32;
    let mut reward = 0.0;
    let summary = run_episode_with(&mut world, agent.as_mut(), |t, report| {
        seen += 1;
        reward += t.reward;
        let w = report.weights.expect("arousal agent reports weights");
        assert!((w.state + w.agent - 1.0).abs() < 1e-9);
    })
    .unwrap();

    assert_eq!(seen, summary.steps);
    assert!((reward - summary.total_reward).abs() < 1e-9);
    assert!(summary.mean_state_arousal.is_some());
    assert!(!world.is_episode_active());
}

#[test]
fn episodes_are_counted_by_the_environment() {
    let cfg = TandemConfig::default();
    let mut world = env(Mood::Friendly);
    let mut agent = build_agent(AgentKind::Monolithic, &cfg, 0).unwrap();
    for expected in 0..5 {
        let summary = run_episode(&mut world, agent.as_mut()).unwrap();
        assert_eq!(summary.episode, expected);
        assert_eq!(summary.mood, Mood::Friendly);
        assert!(summary.mean_agent_arousal.is_none());
    }
    assert_eq!(world.episodes_completed(), 5);
}

#[test]
fn same_seed_same_run() {
    let cfg = TandemConfig::default();
    let run = |seed: u64| {
        let mut world = SocialGridWorld::new(cfg.environment.clone(), seed).unwrap();
        let mut agent = build_agent(AgentKind::Arousal, &cfg, seed).unwrap();
        (0..40)
            .map(|_| run_episode(&mut world, agent.as_mut()).unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(run(11), run(11));
}

#[test]
fn every_variant_learns_to_reach_the_goal() {
    let cfg = TandemConfig::default();
    for kind in [AgentKind::Monolithic, AgentKind::Fixed, AgentKind::Arousal] {
        let mut world = env(Mood::Neutral);
        let mut agent = build_agent(kind, &cfg, 5).unwrap();
        let returns: Vec<f64> = (0..300)
            .map(|_| run_episode(&mut world, agent.as_mut()).unwrap().total_reward)
            .collect();

        let early: f64 = returns[..30].iter().sum::<f64>() / 30.0;
        let late: f64 = returns[270..].iter().sum::<f64>() / 30.0;
        assert!(late > early, "{kind:?}: early {early:.2} late {late:.2}");
        assert!(late > 5.0, "{kind:?} should mostly reach the goal, late mean {late:.2}");
        assert!(!agent.value_table().is_empty());
    }
}

#[test]
fn hostile_contact_shifts_weight_to_agent_domain() {
    let cfg = TandemConfig::default();
    let mut world = env(Mood::Hostile);
    let mut agent = build_agent(AgentKind::Arousal, &cfg, 0).unwrap();

    let mut hostile_steps = 0;
    for _ in 0..50 {
        run_episode_with(&mut world, agent.as_mut(), |t, report| {
            if t.event == StepEvent::Interaction(Mood::Hostile) && t.domain_errors.agent() > 1.0 {
                hostile_steps += 1;
                let reading = report.arousal.expect("arousal reading");
                assert!(reading.agent > reading.state);
                assert_eq!(reading.weights.dominant(), Some(Domain::Agent));
            }
        })
        .unwrap();
    }
    assert!(hostile_steps > 0, "agent should bump into the hostile npc at least once");
}

#[test]
fn fixed_agent_with_state_only_weights_ignores_social_values() {
    let cfg = TandemConfig::default();
    let mut world = env(Mood::Hostile);
    let mut agent = FixedIntegrationAgent::new(
        AgentParams::from(&cfg.training),
        IntegrationWeights::STATE_ONLY,
        1,
    );
    for _ in 0..20 {
        run_episode(&mut world, &mut agent).unwrap();
    }
    let ValueTableView::Split {
        state,
        agent: social,
    } = agent.value_table()
    else {
        panic!("fixed agent keeps one table per domain");
    };
    assert!(!state.is_empty());
    assert!(!social.is_empty(), "social table still learns, it just is not consulted");
    assert_eq!(agent.weights(), IntegrationWeights::STATE_ONLY);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Whatever the seed, an episode terminates within the step limit and
    /// the summary agrees with itself.
    #[test]
    fn episode_summary_is_consistent(seed in 0u64..1000, kind_idx in 0usize..3) {
        let kind = [AgentKind::Monolithic, AgentKind::Fixed, AgentKind::Arousal][kind_idx];
        let cfg = TandemConfig::default();
        let mut world = SocialGridWorld::new(cfg.environment.clone(), seed).unwrap();
        let mut agent = build_agent(kind, &cfg, seed).unwrap();
        let s = run_episode(&mut world, agent.as_mut()).unwrap();

        prop_assert!(s.steps >= 1 && s.steps <= cfg.environment.episode_step_limit);
        prop_assert!(s.interactions + s.wall_collisions + s.wasted_interactions <= s.steps);
        prop_assert_eq!(s.agent, kind);
        if s.reached_goal {
            let shortest = cfg.environment.start_position.manhattan(&cfg.environment.goal_position);
            prop_assert!(s.steps >= shortest);
        }
    }
}
