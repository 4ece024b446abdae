//! 路由描述符：一次可路由 Handler（页面或动作）的不可变身份与元数据。
//!
//! # 教案式说明
//! - **意图（Why）**：描述符是 [`crate::InvokerCache`] 的缓存键，必须可以跨线程共享、按值比较；
//! - **逻辑（How）**：相等性与哈希仅由 [`DescriptorId`] 决定，其余字段视为该 ID 的附属元数据；
//!   注册表负责保证同一集合内 ID 唯一；
//! - **契约（What）**：描述符由注册表创建后不可变，通常以 `Arc<ActionDescriptor>` 形式流转。

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::filter::FilterDescriptor;

/// 描述符的稳定标识。
///
/// - **契约 (What)**：内部为 `Arc<str>`，克隆只增加引用计数；可直接作为 `DashMap` 的键。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(Arc<str>);

impl DescriptorId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DescriptorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DescriptorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DescriptorId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// 描述符所指向的 Handler 种类。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// 页面 Handler，由 [`crate::PageInvokerProvider`] 负责。
    Page,
    /// 控制器动作，不在页面调用器的处理范围内。
    Action,
}

/// 一个可路由 Handler 的描述。
///
/// # 教案式说明
/// - **意图 (Why)**：把路由模板、展示名与静态过滤器声明聚合在一起，构建计划时一次性读取；
/// - **契约 (What)**：
///   - `id` 在注册表的同一版本内唯一；
///   - `filters` 的声明顺序无需预先排序，装配阶段会按 `(order, scope)` 稳定排序；
///   - `PartialEq`/`Hash` 只比较 `id`，与 [`DescriptorId`] 的语义一致。
#[derive(Clone)]
pub struct ActionDescriptor {
    id: DescriptorId,
    kind: DescriptorKind,
    display_name: String,
    route_template: String,
    filters: Vec<FilterDescriptor>,
}

impl ActionDescriptor {
    /// 以页面种类构造描述符。
    pub fn page(id: impl Into<DescriptorId>, route_template: impl Into<String>) -> Self {
        Self::new(id, DescriptorKind::Page, route_template)
    }

    /// 以动作种类构造描述符。
    pub fn action(id: impl Into<DescriptorId>, route_template: impl Into<String>) -> Self {
        Self::new(id, DescriptorKind::Action, route_template)
    }

    fn new(
        id: impl Into<DescriptorId>,
        kind: DescriptorKind,
        route_template: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            display_name: id.as_str().to_owned(),
            id,
            kind,
            route_template: route_template.into(),
            filters: Vec::new(),
        }
    }

    /// 覆盖展示名，默认与 ID 相同。
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// 追加一条静态过滤器声明。
    pub fn with_filter(mut self, filter: FilterDescriptor) -> Self {
        self.filters.push(filter);
        self
    }

    /// 批量追加静态过滤器声明。
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = FilterDescriptor>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn id(&self) -> &DescriptorId {
        &self.id
    }

    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    pub fn is_page(&self) -> bool {
        self.kind == DescriptorKind::Page
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn route_template(&self) -> &str {
        &self.route_template
    }

    pub fn filters(&self) -> &[FilterDescriptor] {
        &self.filters
    }
}

impl PartialEq for ActionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActionDescriptor {}

impl Hash for ActionDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("route_template", &self.route_template)
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// 注册表某一版本下的描述符集合。
///
/// - **契约 (What)**：`version` 单调递增；`items` 保持注册顺序，构造后不可变。
#[derive(Clone, Debug)]
pub struct DescriptorCollection {
    version: u64,
    items: Arc<[Arc<ActionDescriptor>]>,
}

impl DescriptorCollection {
    pub fn new(version: u64, items: impl IntoIterator<Item = Arc<ActionDescriptor>>) -> Self {
        Self {
            version,
            items: items.into_iter().collect(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn items(&self) -> &[Arc<ActionDescriptor>] {
        &self.items
    }

    /// 按 ID 查找描述符。
    pub fn get(&self, id: &str) -> Option<&Arc<ActionDescriptor>> {
        self.items.iter().find(|item| item.id().as_str() == id)
    }
}
