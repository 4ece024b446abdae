//! 过滤器游标：单遍、单所有者地按序遍历异构过滤器列表。
//!
//! # 教案式说明
//! - **意图（Why）**：调用器在一次管线推进中需要逐个取出过滤器，并按调用点需要的能力（同步/异步）
//!   分别看待同一个实例；游标把“位置”与“能力视图”合在一次调用里完成，不产生额外分配；
//! - **逻辑（How）**：游标持有 `Arc<[Arc<dyn Filter>]>` 与一个下标；每次 [`FilterCursor::next_filter`]
//!   对当前元素做两次能力查询，然后无条件前移一位；
//! - **契约（What）**：
//!   - K 个过滤器恰好产出 K 个非终止项（下标 `0..K`），此后每次调用都返回下标为 `K`、两个槽位皆空的终止项；
//!   - 所有操作需要 `&mut self`，同一游标无法被并发推进；
//!   - [`FilterCursor::reset`] 仅用于新一次调用的开始。

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::{Filter, FilterCapability};

/// 游标的一步产出。
///
/// - `filter` 为同步视图槽，`filter_async` 为异步视图槽；
/// - 两个槽位都可能为空：既可能是终止项，也可能是不具备所请求能力的过滤器。
pub struct FilterCursorItem<S: ?Sized, A: ?Sized> {
    index: usize,
    filter: Option<Arc<S>>,
    filter_async: Option<Arc<A>>,
    terminal: bool,
}

impl<S: ?Sized, A: ?Sized> FilterCursorItem<S, A> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn filter(&self) -> Option<&Arc<S>> {
        self.filter.as_ref()
    }

    pub fn filter_async(&self) -> Option<&Arc<A>> {
        self.filter_async.as_ref()
    }

    /// 是否已越过列表末尾。
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// 两个能力槽位是否都为空。
    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && self.filter_async.is_none()
    }

    pub fn into_parts(self) -> (usize, Option<Arc<S>>, Option<Arc<A>>) {
        (self.index, self.filter, self.filter_async)
    }
}

impl<S: ?Sized, A: ?Sized> fmt::Debug for FilterCursorItem<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterCursorItem")
            .field("index", &self.index)
            .field("sync", &self.filter.is_some())
            .field("async", &self.filter_async.is_some())
            .field("terminal", &self.terminal)
            .finish()
    }
}

/// 单次调用独占的过滤器游标。
///
/// 不实现 `Clone`：位置只属于一个所有者，复制游标等于复制位置。
pub struct FilterCursor {
    filters: Arc<[Arc<dyn Filter>]>,
    index: usize,
}

impl FilterCursor {
    pub fn new(filters: Arc<[Arc<dyn Filter>]>) -> Self {
        Self { filters, index: 0 }
    }

    /// 回到列表开头。
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// 下一次调用将要检查的位置。
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// 取出下一个过滤器，并按 `S`（同步）与 `A`（异步）两种能力视图分类。
    ///
    /// # 契约说明
    /// - **前置条件**：无；越界调用合法；
    /// - **后置条件**：未越界时下标恰好前移一位，无论两个视图是否命中；越界后下标停留在 `len`。
    pub fn next_filter<S, A>(&mut self) -> FilterCursorItem<S::View, A::View>
    where
        S: FilterCapability,
        A: FilterCapability,
    {
        let index = self.index;
        match self.filters.get(index) {
            Some(filter) => {
                self.index += 1;
                FilterCursorItem {
                    index,
                    filter: S::view(filter),
                    filter_async: A::view(filter),
                    terminal: false,
                }
            }
            None => {
                trace!(len = self.filters.len(), "filter cursor exhausted");
                FilterCursorItem {
                    index: self.filters.len(),
                    filter: None,
                    filter_async: None,
                    terminal: true,
                }
            }
        }
    }
}

impl fmt::Debug for FilterCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterCursor")
            .field("len", &self.filters.len())
            .field("index", &self.index)
            .finish()
    }
}
