use thiserror::Error;

/// Binding failures. They are raised while the processor is built (before any statement is
/// prepared) except `OverProduction`, raised while the results are consumed.
///
/// They travel inside `anyhow::Error`, use `downcast_ref::<BindError>()` to inspect them.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("Cannot find input for '{token}' in bind bases")]
    UnresolvedInput { token: String },
    #[error("Cannot find output for '{token}' in bind bases")]
    UnresolvedOutput { token: String },
    #[error("Bind '{token}' resolves to null on path element: {element}")]
    NullOnPath { token: String, element: String },
    #[error("Bind '{token}' was not recognized as a terminal")]
    NotTerminal { token: String },
    #[error("Output bind '{token}' is not a valid output container")]
    InvalidContainer { token: String },
    #[error("Output bind '{token}' is a {shape} and should not be a terminal")]
    ContainerAsTerminal { token: String, shape: &'static str },
    #[error("Output bind '{token}' is not a 'select into' column")]
    InvalidSelectInto { token: String },
    #[error("Bind '{token}' is used with the operator '{op}' that does not accept a list")]
    UnsupportedOperator { token: String, op: String },
    #[error("Element {index} of bind '{token}' is not a scalar value")]
    NotScalar { token: String, index: usize },
    #[error("Expected a single value for '{token}' but got multiple values")]
    OverProduction { token: String },
    #[error("Property '{property}' of {bean} cannot be written")]
    ReadOnlyProperty { bean: &'static str, property: String },
    #[error("Cannot convert {value} to {target}")]
    Conversion { value: String, target: &'static str },
}
