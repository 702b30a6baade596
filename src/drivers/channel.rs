use serde::{Deserialize, Serialize};
use crate::drivers::buffer::{Sample, SeriesBuffer};
use crate::drivers::stats::{BandedStats, Statistics, StatsStrategy};
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Stable key, also the field name in incoming records.
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub stats_enabled: bool,
    /// Decimals shown by renderers.
    #[serde(default = "default_precision")]
    pub precision: usize,
}
fn default_precision() -> usize {
    2
}
impl ChannelConfig {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            stats_enabled: false,
            precision: default_precision(),
        }
    }
    pub fn with_stats(mut self) -> Self {
        self.stats_enabled = true;
        self
    }
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }
}
/// What a presenter hands to its renderer after every mutation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelFrame {
    pub key: String,
    /// Oldest first. Consecutive `x` deltas expose gaps to the renderer.
    pub samples: Vec<Sample>,
    pub stats: Option<Statistics>,
}
impl ChannelFrame {
    pub fn latest(&self) -> Option<Sample> {
        self.samples.last().copied()
    }
}
/// Consumer of channel frames (chart widget, PNG exporter, message bus...).
pub trait Renderer {
    fn render(&mut self, frame: &ChannelFrame);
}
impl<F> Renderer for F
where
    F: FnMut(&ChannelFrame),
{
    fn render(&mut self, frame: &ChannelFrame) {
        self(frame)
    }
}
/// One channel: a bounded window plus optional derived statistics.
pub struct ChannelPresenter {
    config: ChannelConfig,
    buffer: SeriesBuffer,
    strategy: Option<Box<dyn StatsStrategy + Send>>,
    stats: Option<Statistics>,
}
impl ChannelPresenter {
    /// Stats-enabled configs get [`BandedStats`] with the default band.
    pub fn new(config: ChannelConfig, capacity: usize) -> Self {
        let strategy: Option<Box<dyn StatsStrategy + Send>> = if config.stats_enabled {
            Some(Box::new(BandedStats::default()))
        } else {
            None
        };
        Self::build(config, capacity, strategy)
    }
    pub fn with_strategy(
        mut config: ChannelConfig,
        capacity: usize,
        strategy: impl StatsStrategy + Send + 'static,
    ) -> Self {
        config.stats_enabled = true;
        Self::build(config, capacity, Some(Box::new(strategy)))
    }
    fn build(
        config: ChannelConfig,
        capacity: usize,
        strategy: Option<Box<dyn StatsStrategy + Send>>,
    ) -> Self {
        let stats = strategy.as_ref().map(|_| Statistics::EMPTY);
        Self {
            config,
            buffer: SeriesBuffer::with_capacity(capacity),
            strategy,
            stats,
        }
    }
    pub fn key(&self) -> &str {
        &self.config.key
    }
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }
    pub fn buffer(&self) -> &SeriesBuffer {
        &self.buffer
    }
    pub fn stats(&self) -> Option<Statistics> {
        self.stats
    }
    pub fn stats_enabled(&self) -> bool {
        self.strategy.is_some()
    }
    pub fn add_point(&mut self, sample: Sample, renderer: &mut dyn Renderer) {
        self.buffer.append(sample);
        self.publish(renderer);
    }
    pub fn load_history(
        &mut self,
        samples: impl IntoIterator<Item = Sample>,
        renderer: &mut dyn Renderer,
    ) {
        self.buffer.replace_all(samples);
        self.publish(renderer);
    }
    pub fn reset(&mut self, renderer: &mut dyn Renderer) {
        self.buffer.clear();
        self.publish(renderer);
    }
    pub fn frame(&self) -> ChannelFrame {
        ChannelFrame {
            key: self.config.key.clone(),
            samples: self.buffer.snapshot(),
            stats: self.stats,
        }
    }
    fn publish(&mut self, renderer: &mut dyn Renderer) {
        let samples = self.buffer.snapshot();
        self.stats = self.strategy.as_ref().map(|strategy| strategy.compute(&samples));
        renderer.render(&ChannelFrame {
            key: self.config.key.clone(),
            samples,
            stats: self.stats,
        });
    }
}
