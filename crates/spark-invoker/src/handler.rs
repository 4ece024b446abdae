//! Handler 编译元数据、加载器与工厂契约。
//!
//! # 教案式说明
//! - **意图（Why）**：把“如何得到 Handler 类型”与“如何实例化/释放 Handler”拆成两个外部协作者，
//!   缓存只负责把它们的产出组装进 [`crate::ExecutionPlan`]；
//! - **逻辑（How）**：[`HandlerLoader`] 产出 [`HandlerTypeMetadata`]，缓存据此编译出
//!   [`CompiledDescriptor`]，再交给 [`HandlerFactoryProvider`] 生成 [`HandlerFactory`] 与
//!   [`HandlerDisposer`]；
//! - **契约（What）**：加载与工厂构造都可能失败，失败会原样冒泡到 `resolve` 调用方，缓存不写入条目。

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::InvocationContext;
use crate::descriptor::ActionDescriptor;
use crate::error::Result;

/// Handler 类型上的一个属性。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyMetadata {
    name: String,
    type_name: String,
}

impl PropertyMetadata {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// 加载器返回的 Handler 类型形状。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerTypeMetadata {
    type_name: String,
    properties: Vec<PropertyMetadata>,
}

impl HandlerTypeMetadata {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.properties.push(PropertyMetadata::new(name, type_name));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn properties(&self) -> &[PropertyMetadata] {
        &self.properties
    }

    /// 按名称查找属性，区分大小写。
    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|property| property.name == name)
    }
}

/// 编译后的描述符：原始描述符 + Handler 类型 + 模型类型。
///
/// - **契约 (What)**：`model_type` 是 Handler 上模型属性的类型名；Handler 没有该属性时为 `None`。
#[derive(Clone, Debug)]
pub struct CompiledDescriptor {
    descriptor: Arc<ActionDescriptor>,
    handler_type: HandlerTypeMetadata,
    model_type: Option<String>,
}

impl CompiledDescriptor {
    /// 以指定的模型属性名编译描述符。
    pub fn compile(
        descriptor: Arc<ActionDescriptor>,
        handler_type: HandlerTypeMetadata,
        model_property: &str,
    ) -> Self {
        let model_type = handler_type
            .property(model_property)
            .map(|property| property.type_name().to_owned());
        Self {
            descriptor,
            handler_type,
            model_type,
        }
    }

    pub fn descriptor(&self) -> &Arc<ActionDescriptor> {
        &self.descriptor
    }

    pub fn handler_type(&self) -> &HandlerTypeMetadata {
        &self.handler_type
    }

    pub fn model_type(&self) -> Option<&str> {
        self.model_type.as_deref()
    }
}

/// 将描述符解析为 Handler 类型。
pub trait HandlerLoader: Send + Sync + 'static {
    fn load(&self, descriptor: &ActionDescriptor) -> Result<HandlerTypeMetadata>;
}

/// Handler 执行产出的结果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// 渲染页面本身。
    Page,
    /// 直接返回文本内容。
    Content(String),
    /// 重定向到给定地址。
    Redirect(String),
    /// 仅返回状态码。
    Status(u16),
}

/// 一次请求内实例化出的 Handler。
///
/// - **契约 (What)**：实例只在一次调用内使用，因此只要求 `Send`；执行结束后交由
///   [`HandlerDisposer`] 释放。
#[async_trait]
pub trait Handler: Send + 'static {
    async fn execute(&mut self, context: &InvocationContext) -> Result<HandlerResult>;
}

type CreateFn = dyn Fn(&InvocationContext) -> Result<Box<dyn Handler>> + Send + Sync;
type DisposeFn = dyn Fn(&InvocationContext, Box<dyn Handler>) + Send + Sync;

/// 按请求实例化 Handler 的能力。
///
/// - **契约 (What)**：克隆只增加引用计数；闭包必须可以被多个请求线程并发调用。
#[derive(Clone)]
pub struct HandlerFactory {
    create: Arc<CreateFn>,
}

impl HandlerFactory {
    pub fn new<F>(create: F) -> Self
    where
        F: Fn(&InvocationContext) -> Result<Box<dyn Handler>> + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(create),
        }
    }

    pub fn create(&self, context: &InvocationContext) -> Result<Box<dyn Handler>> {
        (self.create)(context)
    }
}

impl fmt::Debug for HandlerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HandlerFactory")
    }
}

/// 释放 Handler 实例的能力。
#[derive(Clone)]
pub struct HandlerDisposer {
    dispose: Arc<DisposeFn>,
}

impl HandlerDisposer {
    pub fn new<F>(dispose: F) -> Self
    where
        F: Fn(&InvocationContext, Box<dyn Handler>) + Send + Sync + 'static,
    {
        Self {
            dispose: Arc::new(dispose),
        }
    }

    /// 仅丢弃实例，不做额外清理。
    pub fn drop_only() -> Self {
        Self::new(|_, handler| drop(handler))
    }

    pub fn dispose(&self, context: &InvocationContext, handler: Box<dyn Handler>) {
        (self.dispose)(context, handler);
    }
}

impl fmt::Debug for HandlerDisposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HandlerDisposer")
    }
}

/// 为编译后的描述符生成工厂与销毁器。
pub trait HandlerFactoryProvider: Send + Sync + 'static {
    fn create_factory(&self, compiled: &Arc<CompiledDescriptor>) -> Result<HandlerFactory>;

    fn create_disposer(&self, compiled: &Arc<CompiledDescriptor>) -> Result<HandlerDisposer>;
}
