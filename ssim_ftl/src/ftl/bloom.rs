use rand::{Rng, SeedableRng, rngs::StdRng};

/// Sizing input and result for one Bloom filter.
/// 单个 Bloom 滤波器的定容输入与结果。
///
/// Same contract as the classic open-source builder: the caller states a
/// projected element count and a target false-positive probability, then
/// reads back the optimal table size and hash count; forcing the size pins
/// the table and re-derives only the hash count.
/// 与经典开源构建器的契约一致：调用方给出预计元素数与目标误报概率，读回
/// 最优表大小和哈希个数；强制表大小时只重新推导哈希个数。
#[derive(Debug, Clone)]
pub struct BloomParams {
  pub projected_element_count: u64,
  pub false_positive_probability: f64,
  /// Forced table size bounds in bits; 0 means unbounded.
  /// 强制的表大小上下界（位）；0 表示不设界。
  pub minimum_size: u64,
  pub maximum_size: u64,
  pub maximum_number_of_hashes: u32,
  pub random_seed: u64,
  /// Bits of the sized table.
  /// 定容后的表位数。
  pub table_size: u64,
  pub number_of_hashes: u32,
}

impl BloomParams {
  #[must_use]
  pub fn new(projected_element_count: u64, false_positive_probability: f64, seed: u64) -> Self {
    Self {
      projected_element_count,
      false_positive_probability,
      minimum_size: 0,
      maximum_size: 0,
      maximum_number_of_hashes: 256,
      random_seed: seed,
      table_size: 0,
      number_of_hashes: 0,
    }
  }

  /// Pin the table to exactly `bits`.
  /// 将表大小钉死为 `bits` 位。
  pub fn force_size(&mut self, bits: u64) {
    self.minimum_size = bits;
    self.maximum_size = bits;
  }

  /// Standard optimal sizing: `m = −n·ln p / (ln 2)²`, `k = m/n · ln 2`.
  /// 标准最优定容：`m = −n·ln p / (ln 2)²`，`k = m/n · ln 2`。
  pub fn compute_optimal_parameters(&mut self) {
    let n = self.projected_element_count.max(1) as f64;
    let ln2 = std::f64::consts::LN_2;

    let mut m = (-(n * self.false_positive_probability.ln()) / (ln2 * ln2)).ceil();
    if self.maximum_size > 0 {
      m = m.min(self.maximum_size as f64);
    }
    if self.minimum_size > 0 {
      m = m.max(self.minimum_size as f64);
    }

    let k = (m / n * ln2).round().max(1.0);

    self.table_size = m as u64;
    self.number_of_hashes = (k as u32).min(self.maximum_number_of_hashes);
  }
}

/// One Bloom filter level with its own salts and hit/miss telemetry.
/// 一层 Bloom 滤波器，持有独立盐值及命中/漏判遥测。
#[derive(Debug)]
pub struct BloomFilter {
  table: Vec<u64>,
  salts: Vec<u64>,
  pub table_size: u64,
  pub salt_count: u32,
  /// Insert calls, duplicates included.
  /// 插入调用数，含重复。
  pub inserted: u64,
  pub true_positive: u64,
  pub false_positive: u64,
  pub true_negative: u64,
  /// Inserts that lowered a key's recorded refresh level.
  /// 使某键记录的刷新层级下降的插入数。
  pub actual_insert: u64,
}

impl BloomFilter {
  #[must_use]
  pub fn new(params: &BloomParams) -> Self {
    let words = params.table_size.div_ceil(64) as usize;
    let mut seeder = StdRng::seed_from_u64(params.random_seed);
    let salts = (0..params.number_of_hashes).map(|_| seeder.random()).collect();
    Self {
      table: vec![0; words.max(1)],
      salts,
      table_size: params.table_size.max(64),
      salt_count: params.number_of_hashes,
      inserted: 0,
      true_positive: 0,
      false_positive: 0,
      true_negative: 0,
      actual_insert: 0,
    }
  }

  #[inline]
  fn bit_of(&self, key: u64, salt: u64) -> (usize, u64) {
    let h = rapidhash::rapidhash_seeded(&key.to_le_bytes(), salt) % self.table_size;
    ((h / 64) as usize, 1u64 << (h % 64))
  }

  pub fn insert(&mut self, key: u64) {
    for i in 0..self.salts.len() {
      let (word, mask) = self.bit_of(key, self.salts[i]);
      self.table[word] |= mask;
    }
    self.inserted += 1;
  }

  #[must_use]
  pub fn contains(&self, key: u64) -> bool {
    self.salts.iter().all(|&salt| {
      let (word, mask) = self.bit_of(key, salt);
      self.table[word] & mask != 0
    })
  }

  /// Insert-call count, the builder's notion of element count.
  /// 插入调用计数，即构建器意义上的元素数。
  #[inline]
  #[must_use]
  pub fn element_count(&self) -> u64 {
    self.inserted
  }
}

/// Multi-level Bloom hierarchy: level `i` answers "does this (block, layer)
/// need refresh within `base_period · 2^i`".
/// 多层 Bloom 层级：第 `i` 层回答“该 (block, layer) 是否需要在
/// `base_period · 2^i` 内刷新”。
///
/// Monotonic within an epoch; levels are never cleared by sweeps, only the
/// telemetry counters reset through the stats interface.
/// 在一个纪元内单调增长；扫描不会清空层，只有遥测计数器经统计接口复位。
#[derive(Debug, Default)]
pub struct BloomSet {
  pub filters: Vec<BloomFilter>,
}

impl BloomSet {
  /// Build `num` independently salted levels. Seeds advance per level so no
  /// two levels share a hash family.
  /// 构建 `num` 个独立加盐的层。种子逐层递增，任何两层都不共享哈希族。
  #[must_use]
  pub fn build(num: u32, forced_bits: u64, base_seed: u64) -> (Self, Vec<BloomParams>) {
    let mut params_log = Vec::with_capacity(num as usize);
    let mut filters = Vec::with_capacity(num as usize);
    let mut seed = base_seed;

    for _ in 0..num {
      let mut params = BloomParams::new(10_000, 1.0e-6, seed);
      seed += 1;
      if forced_bits > 0 {
        params.force_size(forced_bits);
      }
      params.compute_optimal_parameters();
      filters.push(BloomFilter::new(&params));
      params_log.push(params);
    }

    (Self { filters }, params_log)
  }

  #[inline]
  #[must_use]
  pub fn level_count(&self) -> usize {
    self.filters.len()
  }

  pub fn insert(&mut self, level: usize, key: u64) {
    self.filters[level].insert(key);
  }

  #[must_use]
  pub fn contains(&self, level: usize, key: u64) -> bool {
    self.filters[level].contains(key)
  }
}
