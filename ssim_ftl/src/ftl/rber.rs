use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

use crate::ftl::conf::FtlConf;

/// Boltzmann constant in eV/K.
/// 以 eV/K 计的玻尔兹曼常数。
const BOLTZMANN_EV: f64 = 8.617e-5;

/// Reference temperature the retention parameters are calibrated at.
/// 保持参数标定所用的参考温度。
const T_NOMINAL: f64 = 300.0;

/// Activation energy for charge loss, eV.
/// 电荷流失的激活能，单位 eV。
const EA: f64 = 1.1;

const NS_PER_HOUR: f64 = 3.6e12;

/// Physics-based raw bit error rate model.
/// 基于物理的原始误码率模型。
///
/// RBER grows with retention time (Arrhenius-accelerated by temperature),
/// with accumulated P/E cycles, and with the wordline layer position:
/// RBER 随保持时间（按温度做 Arrhenius 加速）、累计 P/E 次数以及字线层位置
/// 增长：
///
/// ```text
/// af   = exp((Ea / kB) · (1/T_nominal − 1/T))
/// rber = ε · (1 + α·E^k) · (1 + (Δt_h·af)^β) · (1 + m·(ℓ/layers)^n)
/// ```
///
/// clamped to `[0, 1]`, monotone non-decreasing in `Δt` and `E`.
/// 截断到 `[0, 1]`，对 `Δt` 与 `E` 单调不减。
#[derive(Debug)]
pub struct ErrorModel {
  temperature: f64,
  epsilon: f64,
  alpha: f64,
  beta: f64,
  k_term: f64,
  m_term: f64,
  n_term: f64,
  sigma: f64,
  page_size_bits: f64,
  layers: f64,
  rng: StdRng,
}

impl ErrorModel {
  #[must_use]
  pub fn new(conf: &FtlConf) -> Self {
    Self {
      temperature: conf.temperature,
      epsilon: conf.epsilon,
      alpha: conf.alpha,
      beta: conf.beta,
      k_term: conf.k_term,
      m_term: conf.m_term,
      n_term: conf.n_term,
      sigma: conf.error_sigma,
      page_size_bits: conf.page_size as f64 * 8.0,
      layers: f64::from(conf.layers_per_block.max(1)),
      rng: StdRng::seed_from_u64(conf.random_seed),
    }
  }

  /// Temperature acceleration factor.
  /// 温度加速因子。
  #[inline]
  fn acceleration(&self) -> f64 {
    (EA / BOLTZMANN_EV * (1.0 / T_NOMINAL - 1.0 / self.temperature)).exp()
  }

  /// Predicted RBER after `dt_ns` of retention at `pe` program/erase cycles
  /// on wordline layer `layer`.
  /// 在 `pe` 次 P/E、字线层 `layer` 上保持 `dt_ns` 后的预测 RBER。
  #[must_use]
  pub fn rber(&self, dt_ns: u64, pe: u32, layer: u32) -> f64 {
    let dt_h = dt_ns as f64 / NS_PER_HOUR;
    let cycling = 1.0 + self.alpha * f64::from(pe).powf(self.k_term);
    let retention = 1.0 + (dt_h * self.acceleration()).powf(self.beta);
    let layer_f = 1.0 + self.m_term * (f64::from(layer) / self.layers).powf(self.n_term);
    (self.epsilon * cycling * retention * layer_f).clamp(0.0, 1.0)
  }

  /// Error count drawn around `rber · page_size_bits` with Gaussian noise.
  /// 以 `rber · page_size_bits` 为均值、带高斯噪声抽取的错误数。
  #[must_use]
  pub fn random_errors(&mut self, dt_ns: u64, pe: u32, layer: u32) -> u64 {
    let mean = self.rber(dt_ns, pe, layer) * self.page_size_bits;
    let drawn = match Normal::new(mean, self.sigma) {
      Ok(noise) => noise.sample(&mut self.rng),
      // Degenerate sigma: fall back to the mean
      Err(_) => mean,
    };
    drawn.max(0.0).round() as u64
  }
}
