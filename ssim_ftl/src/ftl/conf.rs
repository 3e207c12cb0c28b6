use std::path::PathBuf;

/// Warmup fill pattern.
/// 预热填充模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillingMode {
  /// Sequential fill, sequential invalidation.
  /// 顺序填充，顺序失效。
  #[default]
  SeqSeq,
  /// Sequential fill, random invalidation within the filled range.
  /// 顺序填充，在已填充范围内随机失效。
  SeqRand,
  /// Random fill, random invalidation.
  /// 随机填充，随机失效。
  RandRand,
}

/// How many blocks one GC cycle reclaims.
/// 一次 GC 周期回收多少块。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GcMode {
  /// A fixed count, `gc_reclaim_block`.
  /// 固定数量，即 `gc_reclaim_block`。
  #[default]
  Fixed,
  /// Refill the pool up to `total_physical_blocks · gc_reclaim_threshold`.
  /// 将空闲池补足到 `total_physical_blocks · gc_reclaim_threshold`。
  Threshold,
}

/// Victim selection policy.
/// 牺牲块选择策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictPolicy {
  /// Fewest valid pages first.
  /// 有效页最少者优先。
  #[default]
  Greedy,
  /// Kawaguchi cost-benefit: utilization over staleness.
  /// Kawaguchi 成本收益：利用率与陈旧度折衷。
  CostBenefit,
  /// Uniform sample of full blocks.
  /// 对已写满块的均匀抽样。
  Random,
  /// Sample `d · n` candidates, keep the `n` cheapest.
  /// 抽样 `d · n` 个候选，保留最便宜的 `n` 个。
  DChoice,
}

/// Which mechanism the periodic refresh event runs.
/// 周期性刷新事件运行哪种机制。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
  /// Sweep one Bloom level per fire and rewrite matching (block, layer) units.
  /// 每次触发扫描一层 Bloom，并重写命中的 (block, layer) 单元。
  #[default]
  BloomSweep,
  /// Migrate every block whose retention time exceeds the threshold.
  /// 迁移所有保持时间超过阈值的块。
  TimeThreshold,
}

/// Full configuration of the FTL core. Field groups mirror the simulator's
/// config sections; defaults describe a small but workable device.
/// FTL 核心的完整配置。字段分组与仿真器的配置节对应；默认值描述一个小而
/// 可用的设备。
#[derive(Debug, Clone)]
pub struct FtlConf {
  // Capacity
  pub io_units_per_page: usize,
  pub pages_in_block: u32,
  pub total_physical_blocks: u32,
  pub total_logical_blocks: u32,
  /// Bytes per page.
  /// 每页字节数。
  pub page_size: u64,
  /// Parallel write stripes (blocks striped by index modulo this).
  /// 并行写条带数（按块号取模分条带）。
  pub page_count_to_max_perf: u32,
  /// Wordline layers per block; refresh acts at (block, layer) granularity.
  /// 每块字线层数；刷新以 (block, layer) 为粒度。
  pub layers_per_block: u32,

  // Warmup
  pub fill_ratio: f64,
  pub invalid_page_ratio: f64,
  pub filling_mode: FillingMode,

  // Garbage collection
  pub gc_threshold_ratio: f64,
  pub gc_mode: GcMode,
  pub gc_reclaim_block: u64,
  pub gc_reclaim_threshold: f64,
  pub gc_evict_policy: EvictPolicy,
  pub gc_d_choice_param: u64,
  /// A block reaching this erase count is retired instead of reused.
  /// 达到该擦除次数的块被退役而不再复用。
  pub bad_block_threshold: u32,
  pub initial_erase_count: u32,

  // Refresh
  /// Seconds of simulated time between refresh fires; 0 disables the event.
  /// 两次刷新触发之间的仿真秒数；0 表示禁用该事件。
  pub refresh_period: u64,
  /// Number of Bloom levels, N_bf.
  /// Bloom 层数，即 N_bf。
  pub refresh_filter_num: u32,
  /// Forced filter size in bits; 0 lets the parameter builder choose.
  /// 强制的滤波器位数；0 表示由参数构建器决定。
  pub refresh_filter_size: u64,
  pub refresh_policy: RefreshPolicy,
  /// RBER the ECC can still correct; predictions above it schedule refresh.
  /// ECC 尚能纠正的 RBER；预测超过它的页会被排入刷新。
  pub refresh_rber_threshold: f64,
  /// Retention age (ns) that triggers migration under `TimeThreshold`.
  /// 在 `TimeThreshold` 策略下触发迁移的保持时长（纳秒）。
  pub refresh_retention_threshold: u64,
  /// Where the human-readable refresh statistics land; `None` disables.
  /// 人类可读的刷新统计写到哪里；`None` 表示不写。
  pub refresh_log_path: Option<PathBuf>,
  pub random_seed: u64,

  // Error model
  /// Operating temperature in Kelvin.
  /// 以开尔文计的工作温度。
  pub temperature: f64,
  pub epsilon: f64,
  pub alpha: f64,
  pub beta: f64,
  pub k_term: f64,
  pub m_term: f64,
  pub n_term: f64,
  pub error_sigma: f64,

  // Write mode
  /// Per-io-unit striping across parallel write targets.
  /// 按 io-unit 在并行写目标间分条。
  pub use_random_io_tweak: bool,
}

impl Default for FtlConf {
  fn default() -> Self {
    Self {
      io_units_per_page: 1,
      pages_in_block: 128,
      total_physical_blocks: 512,
      total_logical_blocks: 460,
      page_size: 4096,
      page_count_to_max_perf: 4,
      layers_per_block: 64,

      fill_ratio: 0.0,
      invalid_page_ratio: 0.0,
      filling_mode: FillingMode::SeqSeq,

      gc_threshold_ratio: 0.05,
      gc_mode: GcMode::Fixed,
      gc_reclaim_block: 1,
      gc_reclaim_threshold: 0.1,
      gc_evict_policy: EvictPolicy::Greedy,
      gc_d_choice_param: 3,
      bad_block_threshold: 100_000,
      initial_erase_count: 0,

      refresh_period: 0,
      refresh_filter_num: 4,
      refresh_filter_size: 0,
      refresh_policy: RefreshPolicy::BloomSweep,
      refresh_rber_threshold: 1e-2,
      refresh_retention_threshold: 30 * 24 * 3600 * ssim_pal::NS_PER_SEC,
      refresh_log_path: None,
      random_seed: 42,

      temperature: 330.0,
      epsilon: 1e-5,
      alpha: 0.05,
      beta: 0.4,
      k_term: 1.1,
      m_term: 0.5,
      n_term: 2.0,
      error_sigma: 64.0,

      use_random_io_tweak: false,
    }
  }
}

impl FtlConf {
  /// Host-visible logical page count.
  /// 主机可见的逻辑页数。
  #[inline]
  #[must_use]
  pub fn total_logical_pages(&self) -> u64 {
    u64::from(self.total_logical_blocks) * u64::from(self.pages_in_block)
  }

  /// Width of one mapping entry: io-unit count under random tweak, else 1.
  /// 单个映射条目的宽度：random tweak 下为 io-unit 数，否则为 1。
  #[inline]
  #[must_use]
  pub fn unit_count(&self) -> usize {
    if self.use_random_io_tweak {
      self.io_units_per_page
    } else {
      1
    }
  }

  /// Refresh period converted to simulated nanoseconds.
  /// 刷新周期换算为仿真纳秒。
  #[inline]
  #[must_use]
  pub fn refresh_period_ns(&self) -> u64 {
    self.refresh_period * ssim_pal::NS_PER_SEC
  }
}
