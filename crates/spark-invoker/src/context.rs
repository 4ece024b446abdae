//! 单次请求的调用上下文。

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::descriptor::ActionDescriptor;

/// 路由命中后传入调用器的请求级上下文。
///
/// # 教案式说明
/// - **意图 (Why)**：计划构建、过滤器工厂与 Handler 工厂都需要知道“当前命中了哪个描述符”以及路由值，
///   但本 crate 不关心 HTTP 细节，因此只保留这两类信息；
/// - **契约 (What)**：上下文在请求开始时构造，之后只读；克隆只复制 `Arc` 与路由值表。
#[derive(Clone, Debug)]
pub struct InvocationContext {
    descriptor: Arc<ActionDescriptor>,
    route_values: BTreeMap<String, String>,
}

impl InvocationContext {
    pub fn new(descriptor: Arc<ActionDescriptor>) -> Self {
        Self {
            descriptor,
            route_values: BTreeMap::new(),
        }
    }

    /// 追加一条路由值，重复键以后写入者为准。
    pub fn with_route_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_values.insert(key.into(), value.into());
        self
    }

    pub fn descriptor(&self) -> &Arc<ActionDescriptor> {
        &self.descriptor
    }

    pub fn route_value(&self, key: &str) -> Option<&str> {
        self.route_values.get(key).map(String::as_str)
    }

    pub fn route_values(&self) -> &BTreeMap<String, String> {
        &self.route_values
    }
}
