/// Bitmap over the io-units of one page.
/// 一个页内各 io-unit 的位图。
///
/// A page is split into at most 64 independently addressable sub-slots; a
/// super-page request sets every bit, a random-tweak request sets a subset.
/// 一个页最多划分为 64 个可独立寻址的子槽；super-page 请求置全部位，
/// random-tweak 请求置其中一部分。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoMap(pub u64);

impl IoMap {
  /// Empty map, no unit selected.
  /// 空位图，没有选中任何单元。
  #[inline]
  #[must_use]
  pub const fn empty() -> Self {
    Self(0)
  }

  /// Map with the low `width` bits set (a super-page).
  /// 低 `width` 位全部置位的位图（即 super-page）。
  #[inline]
  #[must_use]
  pub const fn full(width: usize) -> Self {
    if width >= 64 {
      Self(u64::MAX)
    } else {
      Self((1u64 << width) - 1)
    }
  }

  /// Map with a single unit set.
  /// 仅置一个单元的位图。
  #[inline]
  #[must_use]
  pub const fn one(idx: usize) -> Self {
    Self(1u64 << idx)
  }

  #[inline]
  #[must_use]
  pub const fn test(self, idx: usize) -> bool {
    self.0 >> idx & 1 != 0
  }

  #[inline]
  pub const fn set(&mut self, idx: usize) {
    self.0 |= 1u64 << idx;
  }

  #[inline]
  pub const fn clear(&mut self, idx: usize) {
    self.0 &= !(1u64 << idx);
  }

  /// Count of selected units.
  /// 选中单元的数量。
  #[inline]
  #[must_use]
  pub const fn count(self) -> usize {
    self.0.count_ones() as usize
  }

  #[inline]
  #[must_use]
  pub const fn any(self) -> bool {
    self.0 != 0
  }

  /// True when every unit below `width` is selected.
  /// 当 `width` 以内的所有单元都被选中时为真。
  #[inline]
  #[must_use]
  pub const fn all(self, width: usize) -> bool {
    self.0 & Self::full(width).0 == Self::full(width).0
  }

  #[inline]
  #[must_use]
  pub const fn intersects(self, other: Self) -> bool {
    self.0 & other.0 != 0
  }

  #[inline]
  #[must_use]
  pub const fn union(self, other: Self) -> Self {
    Self(self.0 | other.0)
  }

  /// Complement within `width` bits. Read-before-write uses this to fetch the
  /// untouched units of a partially written page.
  /// `width` 位内取反。read-before-write 用它读取部分写页面中未触及的单元。
  #[inline]
  #[must_use]
  pub const fn flip(self, width: usize) -> Self {
    Self(!self.0 & Self::full(width).0)
  }

  /// Iterate over selected unit indices.
  /// 迭代被选中的单元下标。
  pub fn iter(self) -> impl Iterator<Item = usize> {
    (0..64).filter(move |&i| self.test(i))
  }
}
