use crate::{Arg, Result};

/// Computes the value of `::name(arg, ...)` binds.
///
/// Invoked at most once per statement execution, the value is reused by every batch.
pub trait FunctionResolver: Send + Sync {
    fn invoke(&self, name: &str, args: &[String], roots: &[Arg]) -> Result<Arg>;
}

impl<F> FunctionResolver for F
where
    F: Fn(&str, &[String], &[Arg]) -> Result<Arg> + Send + Sync,
{
    fn invoke(&self, name: &str, args: &[String], roots: &[Arg]) -> Result<Arg> {
        self(name, args, roots)
    }
}
