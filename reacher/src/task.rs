//! The reaching task: episode setup, fence admission of every action,
//! observations and reward.

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::f64::consts::TAU;
use tracing::{debug, info, warn};

use crate::backend::{ActionSpec, PhysicsBackend};
use crate::config::{StartPosition, TaskConfig};
use crate::error::{ReacherError, Result};
use crate::fence::{FenceBounds, SafetyFence};
use crate::kinematics::{ExtremePoint, KinematicChain};
use crate::observation::Observation;
use crate::reward::Tolerance;

/// Draws of a random start pose before giving up on finding one inside the
/// fence.
pub const MAX_START_ATTEMPTS: usize = 100;

/// Smallest target offset from the start tool pose, meters.
const MIN_TARGET_DISTANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeState {
    /// Last joint angles read from the backend.
    pub joint_angles: Vec<f64>,
    pub target_pose: Vector3<f64>,
    /// Whether the last candidate action passed the fence.
    pub safe_step: bool,
    pub tick: u64,
    /// Actions suppressed by the fence this episode.
    pub rejected_steps: u64,
}

/// Owns the backend for the lifetime of the environment and decides, tick by
/// tick, whether an action may reach it.
///
/// ```rust,ignore
/// let mut task = TaskController::new(backend, TaskConfig::default(), FenceBounds::default())?;
/// task.initialize_episode()?;
/// if task.before_step(&action)? {
///     // admitted
/// }
/// task.step()?;
/// let obs = task.observation()?;
/// let reward = task.reward();
/// ```
pub struct TaskController<B: PhysicsBackend> {
    backend: B,
    config: TaskConfig,
    chain: KinematicChain,
    fence: SafetyFence,
    reward: Tolerance,
    rng: StdRng,
    episode: Option<EpisodeState>,
    candidate: Option<Vec<f64>>,
}

impl<B: PhysicsBackend> TaskController<B> {
    /// Builds a controller for the Jaco j2s7s300 chain.
    pub fn new(backend: B, config: TaskConfig, fence: FenceBounds) -> Result<Self> {
        Self::with_chain(backend, config, fence, KinematicChain::jaco_j2s7s300())
    }

    pub fn with_chain(
        backend: B,
        config: TaskConfig,
        fence: FenceBounds,
        chain: KinematicChain,
    ) -> Result<Self> {
        config.validate().map_err(ReacherError::Configuration)?;
        fence.validate().map_err(ReacherError::Configuration)?;

        if let Some(&j) = config.extreme_joints.iter().find(|&&j| j > chain.dof()) {
            return Err(ReacherError::Configuration(format!(
                "extreme joint {j} is past the end of a {}-link chain",
                chain.dof()
            )));
        }
        let actuators = backend.actuator_count();
        if config.degrees_of_freedom > actuators {
            return Err(ReacherError::Configuration(format!(
                "{} degrees of freedom requested but the backend has {} actuators",
                config.degrees_of_freedom, actuators
            )));
        }

        let reward = Tolerance::bounds((0.0, config.reward_radius()))?;
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            backend,
            config,
            chain,
            fence: SafetyFence::new(fence),
            reward,
            rng,
            episode: None,
            candidate: None,
        })
    }

    /// Poses the arm, samples a target near the tool and starts a new episode.
    pub fn initialize_episode(&mut self) -> Result<()> {
        self.episode = None;
        self.candidate = None;

        match self.config.start_position {
            StartPosition::Home => {
                self.backend
                    .initialize_episode(StartPosition::Home, &mut self.rng)?;
                let angles = self.backend.joint_angles();
                if let Some(p) = self.fence.first_violation(&self.extremes(&angles)) {
                    warn!(
                        "home pose puts joint {} outside the fence at {:?}",
                        p.joint,
                        p.position.as_slice()
                    );
                }
            }
            StartPosition::Random => self.random_start()?,
        }

        let joint_angles = self.backend.joint_angles();
        let tool = self.backend.tool_pose();
        let target_pose = self.sample_target(&tool);
        self.backend.set_target(target_pose, self.config.target_size);

        info!(
            "episode started: tool at {:?}, target at {:?} ({:.3} m away)",
            tool.as_slice(),
            target_pose.as_slice(),
            (target_pose - tool).norm()
        );

        self.episode = Some(EpisodeState {
            joint_angles,
            target_pose,
            safe_step: true,
            tick: 0,
            rejected_steps: 0,
        });
        Ok(())
    }

    /// Builds the candidate pose for `action` and checks every monitored
    /// joint of it against the fence. Returns whether the action is admitted.
    pub fn before_step(&mut self, action: &[f64]) -> Result<bool> {
        let actuators = self.backend.actuator_count();
        if action.len() > actuators {
            return Err(ReacherError::InvalidAction(format!(
                "{} values for {} actuators",
                action.len(),
                actuators
            )));
        }

        let episode = self.episode.as_ref().ok_or(ReacherError::NoActiveEpisode)?;

        let mut candidate: Vec<f64> = if self.config.relative_step {
            // no wraparound, angles accumulate
            action
                .iter()
                .zip(&episode.joint_angles)
                .map(|(delta, q)| q + delta)
                .collect()
        } else {
            action.to_vec()
        };
        if candidate.len() < actuators {
            let tail = episode.joint_angles.iter().skip(candidate.len());
            candidate.extend(tail.take(actuators - candidate.len()));
        }
        // the fence must see the pose the actuators will be driven to
        clamp_to_control_range(&mut candidate, &self.backend.action_spec());

        let extremes = self.extremes(&candidate);
        let violation = self.fence.first_violation(&extremes).copied();

        let episode = self.episode.as_mut().ok_or(ReacherError::NoActiveEpisode)?;
        match violation {
            Some(p) => {
                episode.safe_step = false;
                episode.rejected_steps += 1;
                debug!(
                    "joint {} would leave the fence at {:?}; action blocked",
                    p.joint,
                    p.position.as_slice()
                );
            }
            None => episode.safe_step = true,
        }

        self.candidate = Some(candidate);
        Ok(episode.safe_step)
    }

    /// Forwards the admitted candidate to the backend. A rejected candidate
    /// makes this tick a no-op.
    ///
    /// # Errors
    ///
    /// Backend failures are returned as is; the episode state is left as it
    /// was before the call and the episode should be abandoned.
    pub fn step(&mut self) -> Result<()> {
        let episode = self.episode.as_ref().ok_or(ReacherError::NoActiveEpisode)?;
        let safe = episode.safe_step;

        let candidate = self.candidate.take().ok_or_else(|| {
            ReacherError::InvalidAction(
                "no candidate action, before_step was not called".to_string(),
            )
        })?;

        if safe {
            self.backend.step(&candidate)?;
        }

        let joint_angles = safe.then(|| self.backend.joint_angles());
        let episode = self.episode.as_mut().ok_or(ReacherError::NoActiveEpisode)?;
        if let Some(angles) = joint_angles {
            episode.joint_angles = angles;
        }
        episode.tick += 1;
        Ok(())
    }

    /// Refreshes joint angles from the backend and bundles the sensors.
    pub fn observation(&mut self) -> Result<Observation> {
        if self.episode.is_none() {
            return Err(ReacherError::NoActiveEpisode);
        }

        let joint_angles = self.backend.joint_angles();
        let joint_extremes = self.extremes(&joint_angles);

        let episode = self.episode.as_mut().ok_or(ReacherError::NoActiveEpisode)?;
        episode.joint_angles = joint_angles.clone();
        let to_target = joint_extremes
            .last()
            .map_or_else(Vector3::zeros, |tip| episode.target_pose - tip.position);

        Ok(Observation {
            timestep: self.backend.timestep(),
            to_target,
            joint_angles,
            joint_forces: self.backend.joint_forces(),
            joint_velocity: self.backend.joint_velocities(),
            joint_extremes,
        })
    }

    /// 1 while the tool is within `target_size + target_margin` of the
    /// target, 0 otherwise. 0 outside an episode.
    pub fn reward(&self) -> f64 {
        match &self.episode {
            Some(episode) => self.reward.eval(self.distance_to_target(&episode.target_pose)),
            None => 0.0,
        }
    }

    /// Distance between the tool and the target, if an episode is active.
    pub fn distance(&self) -> Option<f64> {
        self.episode
            .as_ref()
            .map(|episode| self.distance_to_target(&episode.target_pose))
    }

    /// Bounds of the controllable joints.
    pub fn action_spec(&self) -> ActionSpec {
        self.backend.action_spec().truncated(self.config.degrees_of_freedom)
    }

    pub fn state(&self) -> Option<&EpisodeState> {
        self.episode.as_ref()
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn fence(&self) -> &SafetyFence {
        &self.fence
    }

    pub fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Ends the episode and releases the backend.
    pub fn close(&mut self) -> Result<()> {
        self.episode = None;
        self.candidate = None;
        self.backend.close()
    }

    fn extremes(&self, joint_angles: &[f64]) -> Vec<ExtremePoint> {
        let dof = self.config.degrees_of_freedom.min(joint_angles.len());
        self.chain
            .evaluate(&joint_angles[..dof], &self.config.extreme_joints)
    }

    fn distance_to_target(&self, target: &Vector3<f64>) -> f64 {
        (self.backend.tool_pose() - target).norm()
    }

    fn random_start(&mut self) -> Result<()> {
        for attempt in 1..=MAX_START_ATTEMPTS {
            self.backend
                .initialize_episode(StartPosition::Random, &mut self.rng)?;
            let angles = self.backend.joint_angles();
            match self.fence.first_violation(&self.extremes(&angles)) {
                None => {
                    debug!("random start accepted after {} draws", attempt);
                    return Ok(());
                }
                Some(p) => debug!("random start rejected: joint {} outside the fence", p.joint),
            }
        }
        Err(ReacherError::Configuration(format!(
            "no random start pose inside the fence after {MAX_START_ATTEMPTS} draws"
        )))
    }

    /// Offset of random length and direction from `tool`, clamped into the
    /// fence.
    ///
    /// The direction is not uniform on the sphere: two independent angles set
    /// the horizontal heading and the vertical component. The offset length is
    /// capped at `max_target_distance`.
    fn sample_target(&mut self, tool: &Vector3<f64>) -> Vector3<f64> {
        let max_distance = self.config.max_target_distance;
        let radius = self.rng.gen_range(MIN_TARGET_DISTANCE..max_distance);
        let theta = self.rng.gen_range(0.0..TAU);
        let phi = self.rng.gen_range(0.0..TAU);

        let mut offset = Vector3::new(
            radius * theta.sin(),
            radius * theta.cos(),
            radius * phi.sin(),
        );
        let length = offset.norm();
        if length > max_distance {
            offset *= max_distance / length;
        }

        self.fence.advisory_clamp(&(tool + offset))
    }
}

/// Clamps each commanded angle into its actuator's control range. NaN stays
/// NaN so the fence still rejects it.
fn clamp_to_control_range(candidate: &mut [f64], spec: &ActionSpec) {
    for (q, (&lo, &hi)) in candidate
        .iter_mut()
        .zip(spec.minimum.iter().zip(&spec.maximum))
    {
        if lo <= hi {
            *q = q.clamp(lo, hi);
        }
    }
}

impl<B: PhysicsBackend> std::fmt::Debug for TaskController<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskController")
            .field("config", &self.config)
            .field("fence", &self.fence)
            .field("episode", &self.episode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedBackend;
    use crate::error::ReacherError;

    fn task(config: TaskConfig, fence: FenceBounds) -> TaskController<SimulatedBackend> {
        let backend = SimulatedBackend::from_model(Default::default(), 0.02).unwrap();
        TaskController::new(backend, config, fence).unwrap()
    }

    fn seeded() -> TaskConfig {
        TaskConfig {
            random_seed: Some(42),
            ..TaskConfig::default()
        }
    }

    #[test]
    fn calls_before_initialization_fail() {
        let mut task = task(seeded(), FenceBounds::default());
        assert!(matches!(task.before_step(&[0.0]), Err(ReacherError::NoActiveEpisode)));
        assert!(matches!(task.step(), Err(ReacherError::NoActiveEpisode)));
        assert!(matches!(task.observation(), Err(ReacherError::NoActiveEpisode)));
        assert_eq!(task.reward(), 0.0);
        assert!(task.state().is_none());
    }

    #[test]
    fn episode_starts_at_home() {
        let mut task = task(seeded(), FenceBounds::default());
        task.initialize_episode().unwrap();
        let state = task.state().unwrap();
        assert_eq!(&state.joint_angles[..7], &crate::backend::J2S7S300_HOME);
        assert!(state.safe_step);
        assert_eq!(state.tick, 0);
        assert_eq!(task.backend().target().map(|(_, size)| size), Some(0.015));
    }

    #[test]
    fn same_seed_same_target() {
        let mut a = task(seeded(), FenceBounds::default());
        let mut b = task(seeded(), FenceBounds::default());
        a.initialize_episode().unwrap();
        b.initialize_episode().unwrap();
        assert_eq!(a.state().unwrap().target_pose, b.state().unwrap().target_pose);
    }

    #[test]
    fn target_is_clamped_into_fence() {
        let fence = FenceBounds::default();
        let mut task = task(seeded(), fence);
        for _ in 0..50 {
            task.initialize_episode().unwrap();
            let target = task.state().unwrap().target_pose;
            assert!(fence.contains(&target), "{target:?}");
        }
    }

    #[test]
    fn short_action_is_padded_with_current_angles() {
        let mut task = task(seeded(), FenceBounds::default());
        task.initialize_episode().unwrap();
        assert!(task.before_step(&[0.01, -0.01]).unwrap());
        let candidate = task.candidate.clone().unwrap();
        let angles = &task.state().unwrap().joint_angles;
        assert_eq!(candidate.len(), 13);
        assert_eq!(candidate[0], angles[0] + 0.01);
        assert_eq!(&candidate[2..7], &angles[2..7]);
        // fingers rest against their stop, past the control range
        assert!(candidate[7..].iter().all(|&f| f == 2.0));
    }

    #[test]
    fn candidate_is_clamped_before_the_fence_check() {
        let mut task = task(seeded(), FenceBounds::default());
        task.initialize_episode().unwrap();

        // a full turn of joint 2 has the same kinematics as home, but the
        // servo stops it at 5.46 rad with the elbow under the floor
        assert!(!task.before_step(&[0.0, TAU]).unwrap());
        assert_eq!(task.candidate.clone().unwrap()[1], 5.46);
        assert_eq!(task.state().unwrap().rejected_steps, 1);
    }

    #[test]
    fn clamping_keeps_nan() {
        let spec = ActionSpec {
            names: vec!["a".to_string(), "b".to_string()],
            minimum: vec![0.0, 0.0],
            maximum: vec![1.0, 1.0],
        };
        let mut candidate = vec![f64::NAN, 3.0, 7.0];
        clamp_to_control_range(&mut candidate, &spec);
        assert!(candidate[0].is_nan());
        assert_eq!(&candidate[1..], &[1.0, 7.0]);
    }

    #[test]
    fn absolute_mode_uses_action_as_is() {
        let config = TaskConfig {
            relative_step: false,
            ..seeded()
        };
        let mut task = task(config, FenceBounds::default());
        task.initialize_episode().unwrap();
        let home = crate::backend::J2S7S300_HOME;
        assert!(task.before_step(&home).unwrap());
        assert_eq!(&task.candidate.clone().unwrap()[..7], &home);
    }

    #[test]
    fn oversized_action_is_invalid() {
        let mut task = task(seeded(), FenceBounds::default());
        task.initialize_episode().unwrap();
        assert!(matches!(
            task.before_step(&[0.0; 14]),
            Err(ReacherError::InvalidAction(_))
        ));
    }

    #[test]
    fn nan_action_is_rejected() {
        let mut task = task(seeded(), FenceBounds::default());
        task.initialize_episode().unwrap();
        assert!(!task.before_step(&[f64::NAN]).unwrap());
        assert_eq!(task.state().unwrap().rejected_steps, 1);
    }

    #[test]
    fn step_without_candidate_is_invalid() {
        let mut task = task(seeded(), FenceBounds::default());
        task.initialize_episode().unwrap();
        assert!(matches!(task.step(), Err(ReacherError::InvalidAction(_))));
    }

    #[test]
    fn accepted_step_moves_the_arm() {
        let mut task = task(seeded(), FenceBounds::default());
        task.initialize_episode().unwrap();
        let before = task.state().unwrap().joint_angles[0];
        assert!(task.before_step(&[0.05]).unwrap());
        task.step().unwrap();
        let obs = task.observation().unwrap();
        assert!(obs.joint_angles[0] > before);
        assert_eq!(task.state().unwrap().tick, 1);
        assert_eq!(obs.joint_extremes.len(), 3);
    }

    #[test]
    fn observation_points_to_target_from_fingertip() {
        let mut task = task(seeded(), FenceBounds::default());
        task.initialize_episode().unwrap();
        let obs = task.observation().unwrap();
        let target = task.state().unwrap().target_pose;
        assert_eq!(obs.to_target, target - obs.joint_extremes[2].position);
        assert_eq!(obs.timestep, 0.02);
        assert_eq!(obs.joint_angles.len(), 13);
    }

    #[test]
    fn action_spec_is_truncated_to_dof() {
        let config = TaskConfig {
            degrees_of_freedom: 5,
            extreme_joints: vec![3, 5],
            ..seeded()
        };
        let task = task(config, FenceBounds::default());
        let spec = task.action_spec();
        assert_eq!(spec.len(), 5);
        assert_eq!(spec.names[4], "jaco_joint_5");
    }

    #[test]
    fn extreme_joint_past_chain_is_a_configuration_error() {
        let backend = SimulatedBackend::from_model(Default::default(), 0.02).unwrap();
        let config = TaskConfig {
            degrees_of_freedom: 13,
            extreme_joints: vec![4, 9],
            ..seeded()
        };
        let err = TaskController::new(backend, config, FenceBounds::default()).unwrap_err();
        assert!(matches!(err, ReacherError::Configuration(_)));
    }

    #[test]
    fn random_start_lands_inside_fence() {
        let config = TaskConfig {
            start_position: StartPosition::Random,
            ..seeded()
        };
        let fence = FenceBounds::default();
        let mut task = task(config, fence);
        task.initialize_episode().unwrap();
        let angles = task.state().unwrap().joint_angles.clone();
        let extremes = task.chain().evaluate(&angles, &[4, 6, 7]);
        assert!(extremes.iter().all(|p| fence.contains(&p.position)));
    }

    #[test]
    fn random_start_gives_up_on_impossible_fence() {
        let config = TaskConfig {
            start_position: StartPosition::Random,
            ..seeded()
        };
        // nothing of the arm reaches this box
        let fence = FenceBounds::new((5.0, 6.0), (5.0, 6.0), (5.0, 6.0));
        let mut task = task(config, fence);
        let err = task.initialize_episode().unwrap_err();
        assert!(matches!(err, ReacherError::Configuration(_)));
        assert!(task.state().is_none());
    }

    #[test]
    fn close_ends_the_episode() {
        let mut task = task(seeded(), FenceBounds::default());
        task.initialize_episode().unwrap();
        task.close().unwrap();
        assert!(task.state().is_none());
    }
}
