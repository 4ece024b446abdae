//! 版本化描述符注册表。
//!
//! # 教案式说明
//! - **意图（Why）**：调用计划缓存需要一个“真相源”来判断路由表是否已重新加载；注册表以单调递增的
//!   版本号表达这一事实，缓存在每次解析时都会重新读取它；
//! - **逻辑（How）**：[`InMemoryDescriptorRegistry`] 使用 `ArcSwap<DescriptorCollection>` 持有当前快照，
//!   读路径仅 `load`，`reload` 通过 `rcu` 原子地替换集合并递增版本；
//! - **契约（What）**：版本号只增不减；同一版本下 `current_descriptors` 返回的集合内容不变。

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::descriptor::{ActionDescriptor, DescriptorCollection};

/// 描述符注册表契约。
///
/// - **线程安全**：实现必须满足 `Send + Sync`，缓存会在任意请求线程上调用；
/// - **一致性**：`current_version` 必须与 `current_descriptors().version()` 描述同一事实，
///   默认实现即由后者派生。
pub trait DescriptorRegistry: Send + Sync + 'static {
    /// 返回当前描述符集合快照。
    fn current_descriptors(&self) -> Arc<DescriptorCollection>;

    /// 返回当前版本号。
    fn current_version(&self) -> u64 {
        self.current_descriptors().version()
    }
}

/// 基于 `ArcSwap` 的内存注册表。
///
/// # 教案式说明
/// - **意图 (Why)**：为宿主与测试提供一个可热更新的默认实现，写路径整表替换、读路径零锁；
/// - **契约 (What)**：
///   - 初始版本为 0，集合为空；
///   - 每次 [`Self::reload`] 使版本加一，即使新集合与旧集合完全相同；
///   - 旧快照在最后一个读者释放后自动回收。
pub struct InMemoryDescriptorRegistry {
    collection: ArcSwap<DescriptorCollection>,
}

impl InMemoryDescriptorRegistry {
    /// 构建空注册表。
    pub fn new() -> Self {
        Self {
            collection: ArcSwap::from_pointee(DescriptorCollection::new(
                0,
                std::iter::empty::<Arc<ActionDescriptor>>(),
            )),
        }
    }

    /// 以初始描述符构建注册表，版本为 1。
    pub fn with_descriptors(descriptors: impl IntoIterator<Item = Arc<ActionDescriptor>>) -> Self {
        Self {
            collection: ArcSwap::from_pointee(DescriptorCollection::new(1, descriptors)),
        }
    }

    /// 替换整张描述符表并递增版本，返回新版本号。
    ///
    /// - **并发 (How)**：`rcu` 闭包可能因竞争被重复执行，因此先把描述符收集为共享切片，
    ///   闭包内只做廉价的 `Arc` 克隆；
    /// - **后置条件**：返回时新集合已对后续所有读者可见。
    pub fn reload(&self, descriptors: impl IntoIterator<Item = Arc<ActionDescriptor>>) -> u64 {
        let items: Arc<[Arc<ActionDescriptor>]> = descriptors.into_iter().collect();
        let previous = self.collection.rcu(|current| {
            DescriptorCollection::new(current.version() + 1, items.iter().cloned())
        });
        let version = previous.version() + 1;
        debug!(version, descriptors = items.len(), "descriptor registry reloaded");
        version
    }
}

impl Default for InMemoryDescriptorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorRegistry for InMemoryDescriptorRegistry {
    fn current_descriptors(&self) -> Arc<DescriptorCollection> {
        self.collection.load_full()
    }
}
