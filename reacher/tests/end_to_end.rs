use reacher::{
    tolerance, BackendConfig, Difficulty, Environment, EnvironmentConfig, FenceBounds,
    PhysicsBackend, Sigmoid, SimulatedBackend, StartPosition, TaskConfig, TaskController,
};

fn generous_task() -> TaskController<SimulatedBackend> {
    let backend = SimulatedBackend::from_model(Default::default(), 0.02).unwrap();
    let config = TaskConfig {
        degrees_of_freedom: 7,
        start_position: StartPosition::Home,
        random_seed: Some(42),
        ..TaskConfig::default()
    };
    TaskController::new(backend, config, FenceBounds::symmetric(10.0)).unwrap()
}

#[test]
fn test_target_within_reach_and_fence() {
    let mut task = generous_task();
    let home_tool = task.backend().tool_pose();
    task.initialize_episode().unwrap();

    let target = task.state().unwrap().target_pose;
    let max_distance = task.config().max_target_distance;
    assert!((target - home_tool).norm() <= max_distance + 1e-12);
    assert!((target - home_tool).norm() >= 0.0);
    assert!(FenceBounds::symmetric(10.0).contains(&target));
}

#[test]
fn test_zero_action_reward_matches_tolerance() {
    let mut task = generous_task();
    task.initialize_episode().unwrap();

    let target = task.state().unwrap().target_pose;
    let initial_distance = (task.backend().tool_pose() - target).norm();
    let radius = task.config().reward_radius();

    assert!(task.before_step(&[0.0; 7]).unwrap());
    task.step().unwrap();

    let expected = tolerance(initial_distance, (0.0, radius), 0.0, Sigmoid::Gaussian, 0.1).unwrap();
    assert_eq!(task.reward(), expected);
    // a zero relative action holds the major joints exactly
    assert_eq!(task.distance(), Some(initial_distance));
}

#[test]
fn test_reward_is_one_at_the_target() {
    let backend = SimulatedBackend::from_model(Default::default(), 0.02).unwrap();
    let config = TaskConfig {
        random_seed: Some(42),
        // a 1 cm offset lands well inside the easy target
        max_target_distance: 0.011,
        target_size: 0.05,
        ..TaskConfig::default()
    };
    let mut task = TaskController::new(backend, config, FenceBounds::symmetric(10.0)).unwrap();
    task.initialize_episode().unwrap();
    assert_eq!(task.reward(), 1.0);
}

#[test]
fn test_seeded_episodes_repeat() {
    let run = || {
        let mut task = generous_task();
        let mut targets = Vec::new();
        for _ in 0..3 {
            task.initialize_episode().unwrap();
            targets.push(task.state().unwrap().target_pose);
        }
        targets
    };
    assert_eq!(run(), run());
}

#[test]
fn test_full_episode_on_every_preset() {
    for difficulty in Difficulty::ALL {
        let mut config = difficulty.environment_config(
            BackendConfig::default(),
            FenceBounds::default(),
            Some(42),
        );
        config.time_limit = 0.2;

        let mut env = Environment::from_config(&config).unwrap();
        let first = env.reset().unwrap();
        assert!(first.is_first());

        let mut steps = 0;
        loop {
            let ts = env.step(&[0.01, -0.01, 0.0, 0.0, 0.0, 0.0, 0.01]).unwrap();
            steps += 1;
            let reward = ts.reward.unwrap();
            assert!(reward == 0.0 || reward == 1.0);
            assert_eq!(ts.observation.joint_extremes.len(), 3);
            if ts.is_last() {
                break;
            }
        }
        assert_eq!(steps, 10, "{difficulty}");
        env.close().unwrap();
    }
}

#[test]
fn test_environment_from_json() {
    let config = EnvironmentConfig::from_json_str(
        r#"{
            "task": {"random_seed": 42, "extreme_joints": [7]},
            "fence": {"x_min": -10, "x_max": 10, "y_min": -10, "y_max": 10, "z_min": -10, "z_max": 10},
            "time_limit": 0.04
        }"#,
    )
    .unwrap();
    let mut env = Environment::from_config(&config).unwrap();
    assert_eq!(env.step_limit(), 2);
    assert_eq!(env.action_spec().len(), 7);

    let ts = env.reset().unwrap();
    assert_eq!(ts.observation.joint_extremes.len(), 1);
    assert_eq!(ts.observation.joint_extremes[0].joint, 7);
}
