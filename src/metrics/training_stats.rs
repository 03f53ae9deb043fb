//! Rolling training statistics for the DQN loop
//!
//! Episode-level metrics (reward, length, food eaten) and learning-step
//! metrics (loss, TD error) kept in fixed-size windows for smoothed reporting.

use std::collections::VecDeque;

/// Training statistics tracker with rolling averages
///
/// # Example
///
/// ```rust
/// use worm_dqn::metrics::TrainingStats;
///
/// let mut stats = TrainingStats::new(100);
///
/// stats.record_episode(-3.5, 150, 5);
/// stats.record_update(0.02, 0.15);
///
/// println!("{}", stats.format_summary(0.5));
/// ```
#[derive(Debug, Clone)]
pub struct TrainingStats {
    /// Episode rewards (rolling window)
    episode_rewards: VecDeque<f32>,

    /// Episode lengths in steps (rolling window)
    episode_lengths: VecDeque<usize>,

    /// Food eaten per episode (rolling window)
    episode_scores: VecDeque<u32>,

    /// Smooth L1 losses (rolling window)
    losses: VecDeque<f32>,

    /// Mean absolute TD errors (rolling window)
    td_errors: VecDeque<f32>,

    /// Best single-episode score seen
    best_score: u32,

    total_episodes: usize,

    total_steps: usize,

    total_updates: usize,

    /// Window size for rolling averages
    window_size: usize,
}

impl TrainingStats {
    /// Create a new training statistics tracker
    ///
    /// # Arguments
    ///
    /// * `window_size` - Number of recent values to keep for rolling averages
    pub fn new(window_size: usize) -> Self {
        Self {
            episode_rewards: VecDeque::with_capacity(window_size),
            episode_lengths: VecDeque::with_capacity(window_size),
            episode_scores: VecDeque::with_capacity(window_size),
            losses: VecDeque::with_capacity(window_size),
            td_errors: VecDeque::with_capacity(window_size),
            best_score: 0,
            total_episodes: 0,
            total_steps: 0,
            total_updates: 0,
            window_size,
        }
    }

    /// Record the completion of an episode
    ///
    /// # Arguments
    ///
    /// * `reward` - Total reward accumulated during the episode
    /// * `length` - Number of steps taken in the episode
    /// * `score` - Food eaten during the episode
    ///
    /// # Example
    ///
    /// ```rust
    /// use worm_dqn::metrics::TrainingStats;
    ///
    /// let mut stats = TrainingStats::new(100);
    /// stats.record_episode(15.5, 150, 5);
    ///
    /// assert_eq!(stats.total_episodes(), 1);
    /// assert_eq!(stats.total_steps(), 150);
    /// assert_eq!(stats.best_score(), 5);
    /// ```
    pub fn record_episode(&mut self, reward: f32, length: usize, score: u32) {
        Self::push_deque(&mut self.episode_rewards, reward, self.window_size);
        Self::push_deque(&mut self.episode_lengths, length, self.window_size);
        Self::push_deque(&mut self.episode_scores, score, self.window_size);
        self.best_score = self.best_score.max(score);
        self.total_episodes += 1;
        self.total_steps += length;
    }

    /// Record a successful learning step
    pub fn record_update(&mut self, loss: f32, mean_td_error: f32) {
        Self::push_deque(&mut self.losses, loss, self.window_size);
        Self::push_deque(&mut self.td_errors, mean_td_error, self.window_size);
        self.total_updates += 1;
    }

    pub fn mean_episode_reward(&self) -> f32 {
        Self::mean(&self.episode_rewards)
    }

    pub fn mean_episode_length(&self) -> f32 {
        let sum: usize = self.episode_lengths.iter().sum();
        if self.episode_lengths.is_empty() {
            0.0
        } else {
            sum as f32 / self.episode_lengths.len() as f32
        }
    }

    pub fn mean_episode_score(&self) -> f32 {
        let sum: u32 = self.episode_scores.iter().sum();
        if self.episode_scores.is_empty() {
            0.0
        } else {
            sum as f32 / self.episode_scores.len() as f32
        }
    }

    /// Mean loss over the rolling window, 0.0 before any update
    pub fn mean_loss(&self) -> f32 {
        Self::mean(&self.losses)
    }

    pub fn mean_td_error(&self) -> f32 {
        Self::mean(&self.td_errors)
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn total_updates(&self) -> usize {
        self.total_updates
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Format a summary of the current statistics
    ///
    /// # Example
    ///
    /// ```rust
    /// use worm_dqn::metrics::TrainingStats;
    ///
    /// let mut stats = TrainingStats::new(100);
    /// stats.record_episode(15.5, 150, 5);
    /// stats.record_update(0.02, 0.15);
    ///
    /// let summary = stats.format_summary(0.95);
    /// assert!(summary.contains("Eps: 0.950"));
    /// ```
    pub fn format_summary(&self, epsilon: f64) -> String {
        format!(
            "Episodes: {} | Steps: {} | Reward: {:.2} | Score: {:.2} | Best: {} | Len: {:.1} | Loss: {:.4} | TD: {:.4} | Eps: {:.3}",
            self.total_episodes,
            self.total_steps,
            self.mean_episode_reward(),
            self.mean_episode_score(),
            self.best_score,
            self.mean_episode_length(),
            self.mean_loss(),
            self.mean_td_error(),
            epsilon,
        )
    }

    fn mean(deque: &VecDeque<f32>) -> f32 {
        if deque.is_empty() {
            0.0
        } else {
            deque.iter().sum::<f32>() / deque.len() as f32
        }
    }

    fn push_deque<T>(deque: &mut VecDeque<T>, value: T, window_size: usize) {
        if deque.len() >= window_size {
            deque.pop_front();
        }
        deque.push_back(value);
    }
}
