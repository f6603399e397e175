use crate::error::TemplateError;
use crate::models::stack::StackName;

/// Read-only source of synthesized templates.
///
/// Produced by the synthesis step; the engine only ever reads from it.
pub trait TemplateStore: Send + Sync {
    /// Every stack with a template, in deployment order.
    fn stack_names(&self) -> Result<Vec<StackName>, TemplateError>;

    /// The exact template body to submit for `stack`.
    fn template_body(&self, stack: &StackName) -> Result<String, TemplateError>;
}
