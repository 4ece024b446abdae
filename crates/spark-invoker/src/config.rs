//! 调用器配置。
//!
//! # 教案式说明
//! - **意图（Why）**：宿主通常把调用器参数与其他组件一起写在 TOML 配置里，这里提供可直接反序列化的
//!   结构体，缺省值与框架内置行为一致；
//! - **契约（What）**：未知字段会被拒绝，避免拼写错误被静默忽略；解析失败统一映射为
//!   [`InvokerError::Configuration`]。

use serde::Deserialize;

use crate::error::{InvokerError, Result};

/// 页面调用器提供者的默认排序键。
pub const DEFAULT_PROVIDER_ORDER: i32 = -1000;

/// 表示绑定模型的 Handler 属性名。
pub const DEFAULT_MODEL_PROPERTY: &str = "Model";

/// 调用器运行参数。
///
/// - `provider_order`：[`crate::PageInvokerProvider`] 在调用器提供者链中的排序键；
/// - `model_property`：编译描述符时用于识别模型类型的属性名；
/// - `prewarm_on_reload`：注册表版本变化后是否立即为全部页面描述符构建计划。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InvokerOptions {
    pub provider_order: i32,
    pub model_property: String,
    pub prewarm_on_reload: bool,
}

impl Default for InvokerOptions {
    fn default() -> Self {
        Self {
            provider_order: DEFAULT_PROVIDER_ORDER,
            model_property: DEFAULT_MODEL_PROPERTY.to_owned(),
            prewarm_on_reload: false,
        }
    }
}

impl InvokerOptions {
    /// 从 TOML 文本解析配置，缺省字段取默认值。
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|err| InvokerError::Configuration {
            detail: err.to_string(),
        })
    }
}
