use thiserror::Error;

/// FTL specialized Result type.
/// FTL 专用的 Result 类型。
pub type Result<T> = std::result::Result<T, Error>;

/// FTL Error Enum. Every variant except `Io` is a precondition violation the
/// simulator treats as fatal.
/// FTL 错误枚举。除 `Io` 外的每个变体都是仿真器视为致命的前置条件违规。
#[derive(Error, Debug)]
pub enum Error {
  /// Free pool exhausted while a block was required.
  /// 需要块时空闲池已耗尽。
  #[error("no free block left")]
  NoFreeBlock,
  /// An operation addressed a block outside the in-use set.
  /// 操作访问了不在使用集中的块。
  #[error("block {0} is not in use")]
  BlockNotInUse(u32),
  /// Erase requested while the victim still holds valid data.
  /// 牺牲块仍持有有效数据时请求擦除。
  #[error("victim block {0} still holds valid pages")]
  ValidPagesInVictim(u32),
  /// Mapping table lost the entry a migration relies on.
  /// 映射表丢失了迁移所依赖的条目。
  #[error("mapping entry missing for lpn {0}")]
  MappingMissing(u64),
  /// Program order violated inside a block.
  /// 块内编程顺序被违反。
  #[error("write to block {block} page {page} unit {unit} out of order")]
  WriteOutOfOrder { block: u32, page: u32, unit: usize },
  /// Warmup writes are sized to never run the pool dry.
  /// 预热写的规模保证不会耗尽空闲池。
  #[error("garbage collection triggered during initialization")]
  GcDuringInit,
  /// Allocator asked for a stripe beyond the configured parallelism.
  /// 分配器请求的条带超出配置的并行度。
  #[error("stripe index {0} out of range")]
  StripeOutOfRange(usize),
  /// Refresh statistics log could not be written.
  /// 无法写入刷新统计日志。
  #[error(transparent)]
  Io(#[from] std::io::Error),
}
