//! Episode loop around a [`TaskController`]: reset, step, time limit.

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{build_backend, ActionSpec, PhysicsBackend};
use crate::config::EnvironmentConfig;
use crate::error::{ReacherError, Result};
use crate::observation::Observation;
use crate::task::TaskController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepType {
    First,
    Mid,
    Last,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeStep {
    pub step_type: StepType,
    /// `None` on the first step of an episode.
    pub reward: Option<f64>,
    pub discount: Option<f64>,
    pub observation: Observation,
    /// Whether the fence admitted the action of this step.
    pub safe_step: bool,
}

impl TimeStep {
    pub fn is_first(&self) -> bool {
        self.step_type == StepType::First
    }

    pub fn is_last(&self) -> bool {
        self.step_type == StepType::Last
    }
}

pub struct Environment<B: PhysicsBackend> {
    task: TaskController<B>,
    step_limit: u64,
    step_count: u64,
    reset_next_step: bool,
}

impl Environment<Box<dyn PhysicsBackend>> {
    /// Builds the configured backend and task.
    pub fn from_config(config: &EnvironmentConfig) -> Result<Self> {
        config.validate()?;
        let backend = build_backend(config)?;
        let task = TaskController::new(backend, config.task.clone(), config.fence)?;
        Self::new(task, config.time_limit)
    }
}

impl<B: PhysicsBackend> Environment<B> {
    /// `time_limit` is in seconds of control time; the episode ends after
    /// `floor(time_limit / timestep)` steps.
    pub fn new(task: TaskController<B>, time_limit: f64) -> Result<Self> {
        let timestep = task.backend().timestep();
        if !(timestep > 0.0) || !(time_limit >= timestep) {
            return Err(ReacherError::Configuration(format!(
                "time limit {time_limit} s does not fit a {timestep} s control step"
            )));
        }
        // tolerate representation error in the division
        let step_limit = (time_limit / timestep + 1e-9).floor() as u64;

        Ok(Self {
            task,
            step_limit,
            step_count: 0,
            reset_next_step: true,
        })
    }

    /// Starts a new episode.
    pub fn reset(&mut self) -> Result<TimeStep> {
        self.reset_next_step = true;
        self.step_count = 0;
        self.task.initialize_episode()?;
        let observation = self.task.observation()?;
        self.reset_next_step = false;

        Ok(TimeStep {
            step_type: StepType::First,
            reward: None,
            discount: None,
            observation,
            safe_step: true,
        })
    }

    /// Applies `action` for one control step. After the last step of an
    /// episode the next call resets instead.
    ///
    /// A malformed action is returned as [`ReacherError::InvalidAction`] and
    /// the episode carries on. Any other failure aborts the episode: the error
    /// is returned and the next call starts a new one.
    pub fn step(&mut self, action: &[f64]) -> Result<TimeStep> {
        if self.reset_next_step {
            return self.reset();
        }

        match self.advance(action) {
            Ok(time_step) => Ok(time_step),
            Err(e @ ReacherError::InvalidAction(_)) => Err(e),
            Err(e) => {
                warn!("episode aborted at step {}: {}", self.step_count, e);
                self.reset_next_step = true;
                Err(e)
            }
        }
    }

    fn advance(&mut self, action: &[f64]) -> Result<TimeStep> {
        let safe_step = self.task.before_step(action)?;
        self.task.step()?;
        let reward = self.task.reward();
        let observation = self.task.observation()?;

        self.step_count += 1;
        let step_type = if self.step_count >= self.step_limit {
            self.reset_next_step = true;
            if let Some(state) = self.task.state() {
                info!(
                    "episode finished after {} steps, {} blocked by the fence",
                    self.step_count, state.rejected_steps
                );
            }
            StepType::Last
        } else {
            StepType::Mid
        };

        Ok(TimeStep {
            step_type,
            reward: Some(reward),
            discount: Some(1.0),
            observation,
            safe_step,
        })
    }

    pub fn action_spec(&self) -> ActionSpec {
        self.task.action_spec()
    }

    pub fn step_limit(&self) -> u64 {
        self.step_limit
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn task(&self) -> &TaskController<B> {
        &self.task
    }

    pub fn task_mut(&mut self) -> &mut TaskController<B> {
        &mut self.task
    }

    pub fn close(&mut self) -> Result<()> {
        self.reset_next_step = true;
        self.task.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskConfig;
    use crate::fence::FenceBounds;

    fn environment(time_limit: f64) -> Environment<Box<dyn PhysicsBackend>> {
        let config = EnvironmentConfig {
            time_limit,
            task: TaskConfig {
                random_seed: Some(3),
                ..TaskConfig::default()
            },
            ..EnvironmentConfig::default()
        };
        Environment::from_config(&config).unwrap()
    }

    #[test]
    fn step_limit_from_time_limit() {
        assert_eq!(environment(10.0).step_limit(), 500);
        assert_eq!(environment(0.1).step_limit(), 5);
        assert_eq!(environment(0.05).step_limit(), 2);
    }

    #[test]
    fn first_step_resets() {
        let mut env = environment(0.1);
        let ts = env.step(&[0.0]).unwrap();
        assert!(ts.is_first());
        assert_eq!(ts.reward, None);
        assert_eq!(ts.discount, None);
    }

    #[test]
    fn episode_ends_at_time_limit_and_restarts() {
        let mut env = environment(0.1);
        env.reset().unwrap();
        let mut types = Vec::new();
        for _ in 0..6 {
            types.push(env.step(&[0.0]).unwrap().step_type);
        }
        assert_eq!(
            types,
            vec![
                StepType::Mid,
                StepType::Mid,
                StepType::Mid,
                StepType::Mid,
                StepType::Last,
                StepType::First
            ]
        );
    }

    #[test]
    fn rejected_steps_are_reported() {
        let mut env = environment(1.0);
        env.reset().unwrap();
        // 3 rad at the shoulder drives the elbow below the table
        let ts = env.step(&[0.0, 3.0]).unwrap();
        assert!(!ts.safe_step);
        assert_eq!(ts.reward, Some(env.task().reward()));
        assert_eq!(env.task().state().unwrap().rejected_steps, 1);
    }

    #[test]
    fn oversized_action_keeps_the_episode() {
        let mut env = environment(1.0);
        env.reset().unwrap();
        env.step(&[0.0]).unwrap();

        let err = env.step(&[0.0; 20]).unwrap_err();
        assert!(matches!(err, ReacherError::InvalidAction(_)));
        assert_eq!(env.step_count(), 1);
        assert_eq!(env.task().state().unwrap().tick, 1);

        let ts = env.step(&[0.0]).unwrap();
        assert_eq!(ts.step_type, StepType::Mid);
        assert_eq!(env.step_count(), 2);
    }

    #[test]
    fn failed_step_forces_reset() {
        let mut env = environment(1.0);
        env.reset().unwrap();
        // ending the episode under the environment makes the next step fail
        env.task_mut().close().unwrap();
        let err = env.step(&[0.0]).unwrap_err();
        assert!(matches!(err, ReacherError::NoActiveEpisode));
        assert!(env.step(&[0.0]).unwrap().is_first());
    }

    #[test]
    fn invalid_time_limit() {
        let backend = crate::backend::SimulatedBackend::from_model(Default::default(), 0.02).unwrap();
        let task = TaskController::new(backend, TaskConfig::default(), FenceBounds::default()).unwrap();
        assert!(Environment::new(task, 0.01).is_err());
    }
}
