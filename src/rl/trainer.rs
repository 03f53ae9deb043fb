//! Double-DQN learning step
//!
//! One call to [`DqnTrainer::learn`]:
//!
//! 1. samples a prioritized batch,
//! 2. evaluates `Q(s, a)` with the policy network,
//! 3. picks `argmax_a' Q_policy(s', a')` and scores it with the target network,
//! 4. regresses onto `r + (1 - terminal) * gamma * Q_target(s', a*)` with a
//!    smooth L1 loss,
//! 5. steps Adam with every gradient component clamped to `[-clip, clip]`,
//! 6. writes `|td| + priority_epsilon` back as the new priorities.
//!
//! Targets are built on the inner backend from the inference copy of the
//! policy and from the target network, so no gradient ever reaches them. The target network is a hard copy of the policy
//! taken every `target_sync_interval` successful steps.

use burn::{
    module::{AutodiffModule, Module, ModuleVisitor, ParamId},
    optim::{Adam, AdamConfig, GradientsParams, Optimizer, adaptor::OptimizerAdaptor},
    tensor::{ElementConversion, Int, Tensor, TensorData, backend::AutodiffBackend},
};
use rand::RngCore;
use tracing::debug;

use super::config::DqnConfig;
use super::error::LearnError;
use super::features::features_to_tensor;
use super::network::ValueNetwork;
use super::replay::{ReplayMemory, SampledBatch};

/// Summary of one successful learning step
#[derive(Debug, Clone, PartialEq)]
pub struct LearnReport {
    /// Mean smooth L1 loss over the batch
    pub loss: f32,

    /// Mean `|Q(s, a) - target|` over the batch
    pub mean_td_error: f32,

    /// Learning steps completed, including this one
    pub step: usize,

    /// Whether this step copied the policy into the target network
    pub target_synced: bool,
}

/// Result of [`DqnTrainer::learn`]
#[derive(Debug, Clone, PartialEq)]
pub enum LearnOutcome {
    /// Replay memory holds fewer transitions than one batch
    Skipped,
    Trained(LearnReport),
}

/// Policy/target network pair with its optimizer and step counter
pub struct DqnTrainer<B: AutodiffBackend> {
    /// Network being optimized
    policy: ValueNetwork<B>,

    /// Non-autodiff copy of `policy`, refreshed after every step
    inference: ValueNetwork<B::InnerBackend>,

    /// Periodic snapshot of `policy`, never ahead of it
    target: ValueNetwork<B::InnerBackend>,

    /// Gradients reach it already clipped
    optim: OptimizerAdaptor<Adam, ValueNetwork<B>, B>,

    config: DqnConfig,

    /// Successful learning steps so far
    steps: usize,

    device: B::Device,
}

impl<B: AutodiffBackend> DqnTrainer<B> {
    /// Create a trainer with a freshly initialized policy network
    ///
    /// The target network starts as an exact copy of the policy.
    pub fn new(config: DqnConfig, device: B::Device) -> Self {
        let policy = config.network.init::<B>(&device);
        Self::with_policy(policy, config, device)
    }

    /// Create a trainer around an existing policy network
    pub fn with_policy(policy: ValueNetwork<B>, config: DqnConfig, device: B::Device) -> Self {
        let optim = AdamConfig::new().init();
        let inference = policy.valid();
        let target = inference.clone();

        Self {
            policy,
            inference,
            target,
            optim,
            config,
            steps: 0,
            device,
        }
    }

    /// Sample a batch from `memory` and train on it
    ///
    /// Priorities of the sampled entries are rewritten only when the step
    /// succeeds.
    pub fn learn(
        &mut self,
        memory: &mut dyn ReplayMemory,
        rng: &mut dyn RngCore,
    ) -> Result<LearnOutcome, LearnError> {
        if memory.len() < self.config.batch_size {
            return Ok(LearnOutcome::Skipped);
        }
        let Some(batch) = memory.sample(self.config.batch_size, rng) else {
            return Ok(LearnOutcome::Skipped);
        };

        let (report, priorities) = self.train_on_batch(&batch)?;
        memory.update_priorities(&batch.indices, &priorities);

        Ok(LearnOutcome::Trained(report))
    }

    /// Run one optimization step on an explicit batch
    ///
    /// # Returns
    ///
    /// The step report and the new priority for every row of the batch
    pub fn train_on_batch(
        &mut self,
        batch: &SampledBatch,
    ) -> Result<(LearnReport, Vec<f32>), LearnError> {
        let (loss, loss_value, td_errors) = self.batch_loss(batch)?;

        let mut grads = GradientsParams::from_grads(loss.backward(), &self.policy);
        self.clip_gradients(&mut grads);
        self.policy = self
            .optim
            .step(self.config.learning_rate, self.policy.clone(), grads);
        self.inference = self.policy.valid();

        self.steps += 1;
        let target_synced = self.steps % self.config.target_sync_interval == 0;
        if target_synced {
            self.target = self.inference.clone();
            debug!(step = self.steps, "target network synced");
        }

        let mean_td_error = td_errors.iter().sum::<f32>() / batch.len() as f32;
        let priorities = td_errors
            .iter()
            .map(|e| e + self.config.priority_epsilon)
            .collect();

        Ok((
            LearnReport {
                loss: loss_value,
                mean_td_error,
                step: self.steps,
                target_synced,
            },
            priorities,
        ))
    }

    /// Smooth L1 loss over the batch with its scalar value and per-row `|td|`
    ///
    /// Fails without touching any state when the loss or a TD error is not
    /// finite.
    fn batch_loss(
        &self,
        batch: &SampledBatch,
    ) -> Result<(Tensor<B, 1>, f32, Vec<f32>), LearnError> {
        let batch_size = batch.len();
        let transitions = &batch.transitions;

        let states =
            features_to_tensor::<B>(transitions.iter().map(|t| &t.state), &self.device);
        let actions: Tensor<B, 1, Int> = Tensor::from_data(
            TensorData::new(
                transitions.iter().map(|t| t.action.index() as i64).collect(),
                [batch_size],
            ),
            &self.device,
        );

        // Q(s, a) for the actions actually taken
        let q_taken = self
            .policy
            .forward_batch(states)
            .gather(1, actions.unsqueeze_dim(1))
            .squeeze::<1>(1);

        let targets = self.double_dqn_targets(batch);
        let td = q_taken.clone() - Tensor::<B, 1>::from_inner(targets.clone());

        // Smooth L1 with a unit threshold
        let abs = td.abs();
        let quadratic = abs.clone().clamp_max(1.0);
        let linear = abs - quadratic.clone();
        let loss = (quadratic.clone() * quadratic * 0.5 + linear).mean();

        let loss_value = loss.clone().into_scalar().elem::<f32>();
        if !loss_value.is_finite() {
            return Err(LearnError::NonFiniteLoss(loss_value));
        }

        let td_errors = (q_taken.clone().inner() - targets)
            .abs()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| LearnError::Tensor(format!("{e:?}")))?;
        if td_errors.iter().any(|e| !e.is_finite()) {
            return Err(LearnError::NonFiniteTdError);
        }

        Ok((loss, loss_value, td_errors))
    }

    /// Clamp every gradient component to `[-grad_clip, grad_clip]`
    fn clip_gradients(&self, grads: &mut GradientsParams) {
        self.policy.visit(&mut ValueClip {
            grads,
            clip: self.config.grad_clip,
        });
    }

    /// `r + (1 - terminal) * gamma * Q_target(s', argmax_a' Q_policy(s', a'))`
    fn double_dqn_targets(&self, batch: &SampledBatch) -> Tensor<B::InnerBackend, 1> {
        let batch_size = batch.len();
        let transitions = &batch.transitions;

        let next_states = features_to_tensor::<B::InnerBackend>(
            transitions.iter().map(|t| &t.next_state),
            &self.device,
        );
        let rewards: Tensor<B::InnerBackend, 1> = Tensor::from_data(
            TensorData::new(transitions.iter().map(|t| t.reward).collect(), [batch_size]),
            &self.device,
        );
        let continuing: Tensor<B::InnerBackend, 1> = Tensor::from_data(
            TensorData::new(
                transitions
                    .iter()
                    .map(|t| if t.terminal { 0.0f32 } else { 1.0 })
                    .collect(),
                [batch_size],
            ),
            &self.device,
        );

        let best_actions = self
            .inference
            .forward_batch(next_states.clone())
            .argmax(1);
        let next_values = self
            .target
            .forward_batch(next_states)
            .gather(1, best_actions)
            .squeeze::<1>(1);

        rewards + continuing * next_values * self.config.gamma
    }

    /// Current exploration rate, `max(min, start * decay^steps)`
    pub fn epsilon(&self) -> f64 {
        self.config.epsilon_after(self.steps)
    }

    /// Successful learning steps so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn policy(&self) -> &ValueNetwork<B> {
        &self.policy
    }

    /// Inference copy of the policy network for action selection
    pub fn inference_policy(&self) -> &ValueNetwork<B::InnerBackend> {
        &self.inference
    }

    pub fn target(&self) -> &ValueNetwork<B::InnerBackend> {
        &self.target
    }
}

/// Visits every float parameter and clamps its gradient in place
struct ValueClip<'a> {
    grads: &'a mut GradientsParams,
    clip: f32,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for ValueClip<'_> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register(id, grad.clamp(-self.clip, self.clip));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Direction;
    use crate::rl::features::FEATURE_COUNT;
    use crate::rl::replay::{ReplayKind, Transition, build_replay};
    use burn::backend::{
        Autodiff,
        ndarray::{NdArray, NdArrayDevice},
    };
    use rand::{SeedableRng, rngs::StdRng};

    type TestBackend = Autodiff<NdArray<f32>>;
    type TestInferenceBackend = NdArray<f32>;

    fn small_config() -> DqnConfig {
        DqnConfig {
            batch_size: 8,
            replay_capacity: 64,
            ..Default::default()
        }
    }

    fn transition(seed: usize, reward: f32, terminal: bool) -> Transition {
        let mut state = [0.0; FEATURE_COUNT];
        let mut next_state = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            state[i] = ((seed * 7 + i * 3) % 11) as f32 / 11.0;
            next_state[i] = ((seed * 5 + i) % 13) as f32 / 13.0;
        }
        Transition {
            state,
            action: Direction::ALL[seed % Direction::COUNT],
            reward,
            next_state,
            terminal,
        }
    }

    fn fixed_outputs(network: &ValueNetwork<TestInferenceBackend>) -> Vec<f32> {
        let device = NdArrayDevice::default();
        let rows = [[0.25; FEATURE_COUNT], [0.75; FEATURE_COUNT]];
        network
            .forward_batch(features_to_tensor(rows.iter(), &device))
            .into_data()
            .to_vec::<f32>()
            .unwrap()
    }

    /// Row-major Q values of `network` on the next states of `batch`
    fn next_state_values(
        network: &ValueNetwork<TestInferenceBackend>,
        batch: &SampledBatch,
    ) -> Vec<[f32; Direction::COUNT]> {
        let device = NdArrayDevice::default();
        let flat = network
            .forward_batch(features_to_tensor(
                batch.transitions.iter().map(|t| &t.next_state),
                &device,
            ))
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        flat.chunks(Direction::COUNT)
            .map(|row| [row[0], row[1], row[2], row[3]])
            .collect()
    }

    struct MaxGradient<'a> {
        grads: &'a GradientsParams,
        max: f32,
    }

    impl ModuleVisitor<TestBackend> for MaxGradient<'_> {
        fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<TestBackend, D>) {
            if let Some(grad) = self.grads.get::<TestInferenceBackend, D>(id) {
                let largest = grad.abs().max().into_scalar().elem::<f32>();
                self.max = self.max.max(largest);
            }
        }
    }

    fn max_gradient(network: &ValueNetwork<TestBackend>, grads: &GradientsParams) -> f32 {
        let mut visitor = MaxGradient { grads, max: 0.0 };
        network.visit(&mut visitor);
        visitor.max
    }

    #[test]
    fn test_skips_until_warm() {
        let mut trainer = DqnTrainer::<TestBackend>::new(small_config(), NdArrayDevice::default());
        let mut memory = build_replay(ReplayKind::Standard, 64);
        let mut rng = StdRng::seed_from_u64(0);

        for i in 0..7 {
            memory.add(transition(i, 0.0, false));
        }

        let outcome = trainer.learn(memory.as_mut(), &mut rng).unwrap();
        assert_eq!(outcome, LearnOutcome::Skipped);
        assert_eq!(trainer.steps(), 0);
        assert_eq!(trainer.epsilon(), 1.0);
    }

    #[test]
    fn test_learn_updates_priorities_and_epsilon() {
        let mut trainer = DqnTrainer::<TestBackend>::new(small_config(), NdArrayDevice::default());
        let mut memory = build_replay(ReplayKind::SumTree, 64);
        let mut rng = StdRng::seed_from_u64(1);

        for i in 0..16 {
            memory.add(transition(i, 0.5, i % 3 == 0));
        }

        let outcome = trainer.learn(memory.as_mut(), &mut rng).unwrap();
        let LearnOutcome::Trained(report) = outcome else {
            panic!("expected a training step");
        };

        assert!(report.loss.is_finite());
        assert_eq!(report.step, 1);
        assert!(!report.target_synced);
        assert_eq!(trainer.epsilon(), 0.995);

        let changed = (0..memory.len())
            .filter(|&i| memory.priority(i) != Some(1.0))
            .count();
        assert!(changed > 0);
        assert!((0..memory.len()).all(|i| memory.priority(i).unwrap() > 0.0));
    }

    #[test]
    fn test_epsilon_closed_form_over_steps() {
        let mut trainer = DqnTrainer::<TestBackend>::new(small_config(), NdArrayDevice::default());
        let batch = SampledBatch {
            transitions: (0..8).map(|i| transition(i, 0.0, false)).collect(),
            indices: (0..8).collect(),
        };

        for _ in 0..10 {
            trainer.train_on_batch(&batch).unwrap();
        }

        assert!((trainer.epsilon() - 0.995f64.powi(10)).abs() < 1e-12);
        assert!((trainer.epsilon() - 0.95111).abs() < 1e-4);
    }

    #[test]
    fn test_target_changes_only_at_sync_multiples() {
        let mut trainer = DqnTrainer::<TestBackend>::new(small_config(), NdArrayDevice::default());
        let batch = SampledBatch {
            transitions: (0..8).map(|i| transition(i, 1.0, false)).collect(),
            indices: (0..8).collect(),
        };

        assert_eq!(
            fixed_outputs(trainer.target()),
            fixed_outputs(trainer.inference_policy())
        );
        let mut previous_target = fixed_outputs(trainer.target());

        for step in 1..=12 {
            let (report, _) = trainer.train_on_batch(&batch).unwrap();
            let target = fixed_outputs(trainer.target());

            if step % 5 == 0 {
                assert!(report.target_synced);
                assert_eq!(target, fixed_outputs(trainer.inference_policy()), "step {step}");
                assert_ne!(target, previous_target, "step {step}");
            } else {
                assert!(!report.target_synced);
                assert_eq!(target, previous_target, "step {step}");
                assert_ne!(target, fixed_outputs(trainer.inference_policy()), "step {step}");
            }
            previous_target = target;
        }
    }

    #[test]
    fn test_inference_copy_tracks_policy() {
        let mut trainer = DqnTrainer::<TestBackend>::new(small_config(), NdArrayDevice::default());
        let batch = SampledBatch {
            transitions: (0..8).map(|i| transition(i, 1.0, true)).collect(),
            indices: (0..8).collect(),
        };
        let before = fixed_outputs(trainer.inference_policy());

        trainer.train_on_batch(&batch).unwrap();

        let after = fixed_outputs(trainer.inference_policy());
        assert_ne!(after, before);
        assert_eq!(after, fixed_outputs(&trainer.policy().valid()));
    }

    #[test]
    fn test_loss_decreases_on_fixed_terminal_batch() {
        let config = DqnConfig {
            batch_size: 64,
            ..Default::default()
        };
        let mut trainer = DqnTrainer::<TestBackend>::new(config, NdArrayDevice::default());
        let batch = SampledBatch {
            transitions: (0..64).map(|i| transition(i, 1.0, true)).collect(),
            indices: (0..64).collect(),
        };

        let (first, _) = trainer.train_on_batch(&batch).unwrap();
        let mut last = first.clone();
        for _ in 1..50 {
            last = trainer.train_on_batch(&batch).unwrap().0;
        }

        assert!(
            last.loss < first.loss,
            "loss should fall: {} -> {}",
            first.loss,
            last.loss
        );
        assert_eq!(last.step, 50);
    }

    #[test]
    fn test_non_finite_loss_leaves_agent_unchanged() {
        let mut trainer = DqnTrainer::<TestBackend>::new(small_config(), NdArrayDevice::default());
        let mut memory = build_replay(ReplayKind::Standard, 64);
        let mut rng = StdRng::seed_from_u64(3);

        for i in 0..8 {
            memory.add(transition(i, f32::NAN, false));
        }
        let policy_before = fixed_outputs(trainer.inference_policy());
        let target_before = fixed_outputs(trainer.target());

        let result = trainer.learn(memory.as_mut(), &mut rng);

        assert!(matches!(result, Err(LearnError::NonFiniteLoss(_))));
        assert_eq!(trainer.steps(), 0);
        assert_eq!(trainer.epsilon(), 1.0);
        assert_eq!(fixed_outputs(trainer.inference_policy()), policy_before);
        assert_eq!(fixed_outputs(trainer.target()), target_before);
        assert!((0..memory.len()).all(|i| memory.priority(i) == Some(1.0)));
    }

    #[test]
    fn test_priorities_carry_floor() {
        let mut trainer = DqnTrainer::<TestBackend>::new(small_config(), NdArrayDevice::default());
        let batch = SampledBatch {
            transitions: (0..8).map(|i| transition(i, 0.0, true)).collect(),
            indices: (0..8).collect(),
        };

        let (_, priorities) = trainer.train_on_batch(&batch).unwrap();

        assert_eq!(priorities.len(), 8);
        assert!(priorities.iter().all(|p| *p >= 1e-6 && p.is_finite()));
    }

    #[test]
    fn test_double_dqn_targets_match_hand_computation() {
        // Keep the target frozen while the policy moves away from it
        let config = DqnConfig {
            learning_rate: 1e-2,
            target_sync_interval: 1_000,
            ..small_config()
        };
        let mut trainer = DqnTrainer::<TestBackend>::new(config, NdArrayDevice::default());
        let warmup = SampledBatch {
            transitions: (0..8).map(|i| transition(i, 2.0, false)).collect(),
            indices: (0..8).collect(),
        };
        for _ in 0..20 {
            trainer.train_on_batch(&warmup).unwrap();
        }

        let batch = SampledBatch {
            transitions: (0..8)
                .map(|i| transition(i + 3, i as f32 * 0.25 - 1.0, i % 2 == 0))
                .collect(),
            indices: (0..8).collect(),
        };
        let policy_values = next_state_values(trainer.inference_policy(), &batch);
        let target_values = next_state_values(trainer.target(), &batch);

        let mut divergence = 0.0f32;
        let expected: Vec<f32> = batch
            .transitions
            .iter()
            .zip(policy_values.iter().zip(&target_values))
            .map(|(t, (policy_row, target_row))| {
                let best = (0..Direction::COUNT)
                    .max_by(|&a, &b| policy_row[a].total_cmp(&policy_row[b]))
                    .unwrap();
                divergence += (policy_row[best] - target_row[best]).abs();
                let continuing = if t.terminal { 0.0 } else { 1.0 };
                t.reward + continuing * 0.99 * target_row[best]
            })
            .collect();
        assert!(divergence > 1e-3, "networks did not diverge: {divergence}");

        let targets = trainer
            .double_dqn_targets(&batch)
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        for (row, (got, want)) in targets.iter().zip(&expected).enumerate() {
            assert!((got - want).abs() < 1e-5, "row {row}: {got} vs {want}");
            if batch.transitions[row].terminal {
                assert_eq!(*got, batch.transitions[row].reward, "row {row}");
            }
        }
    }

    #[test]
    fn test_gradients_clipped_per_component() {
        let config = DqnConfig {
            grad_clip: 0.1,
            ..small_config()
        };
        let trainer = DqnTrainer::<TestBackend>::new(config, NdArrayDevice::default());
        // One shared action and a large reward push the output bias gradient to 1
        let batch = SampledBatch {
            transitions: (0..8)
                .map(|i| Transition {
                    action: Direction::Left,
                    ..transition(i, 50.0, true)
                })
                .collect(),
            indices: (0..8).collect(),
        };

        let (loss, _, _) = trainer.batch_loss(&batch).unwrap();
        let mut grads = GradientsParams::from_grads(loss.backward(), trainer.policy());
        assert!(max_gradient(trainer.policy(), &grads) > 0.5);

        trainer.clip_gradients(&mut grads);

        assert!(max_gradient(trainer.policy(), &grads) <= 0.1 + 1e-6);
    }
}
