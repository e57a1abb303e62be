//! Batch symbol entry.
//!
//! All trees in a batch are entered into the shared scope in one call so
//! that attribution can resolve references across units of the same batch.
//! Entry failure is reported to the caller but everything entered before the
//! failure stays in the scope and queued for attribution -- the pipeline
//! logs the failure and attribution proceeds best-effort on the entered
//! subset.

use crate::context::{ClassSymbol, Context};
use crate::tree::CompilationUnit;
use std::fmt;

#[derive(Debug)]
pub struct EnterError {
    pub fqn: String,
    pub first_unit: String,
    pub unit: String,
}

impl fmt::Display for EnterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "duplicate class symbol '{}' entered from '{}': first entered from '{}'",
            self.fqn, self.unit, self.first_unit
        )
    }
}

impl std::error::Error for EnterError {}

pub fn qualify(package: Option<&str>, name: &str) -> String {
    match package {
        Some(p) => format!("{}.{}", p, name),
        None => name.to_owned(),
    }
}

/// Enter every unit's top-level classes into the shared scope and queue each
/// unit for attribution.
pub fn enter_all<'a>(
    ctx: &mut Context,
    units: impl IntoIterator<Item = (&'a str, &'a CompilationUnit)>,
) -> Result<(), EnterError> {
    for (display, unit) in units {
        ctx.push_todo(display.to_owned());
        for class in &unit.classes {
            let fqn = qualify(unit.package.as_deref(), &class.name);
            if let Some(first) = ctx.scope().get(&fqn) {
                return Err(EnterError {
                    fqn,
                    first_unit: first.unit.clone(),
                    unit: display.to_owned(),
                });
            }
            ctx.scope_mut().enter(ClassSymbol {
                fqn,
                simple_name: class.name.clone(),
                package: unit.package.clone(),
                unit: display.to_owned(),
                decl: class.id,
            });
        }
    }
    Ok(())
}
