//! Matching call arguments to value parameters.

use crate::applicability::ResolutionDiagnostic;
use crate::declarations::ValueParameter;
use crate::expression::CallArgument;

/// One argument bound to one parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MappedArgument {
    pub argument: usize,
    pub parameter: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArgumentMapping {
    /// In argument order.
    pub mapped: Vec<MappedArgument>,
    /// Parameters left to their default value.
    pub defaults_used: usize,
    pub diagnostics: Vec<ResolutionDiagnostic>,
}

impl ArgumentMapping {
    pub fn parameter_of(&self, argument: usize) -> Option<usize> {
        self.mapped
            .iter()
            .find(|m| m.argument == argument)
            .map(|m| m.parameter)
    }

    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Bind `args` to `params`.
///
/// Positional arguments fill parameters left to right, a vararg parameter
/// absorbing every positional argument that reaches it. Named arguments
/// bind by name; a positional argument after a named one is rejected. A
/// trailing lambda always binds the last parameter.
pub fn map_arguments(params: &[ValueParameter], args: &[CallArgument]) -> ArgumentMapping {
    let mut mapping = ArgumentMapping::default();
    let mut filled = vec![false; params.len()];
    let mut next_positional = 0;
    let mut seen_named = false;

    for (index, arg) in args.iter().enumerate() {
        if arg.is_trailing_lambda {
            let last = params.len().checked_sub(1);
            match last {
                Some(last) if !filled[last] || params[last].is_vararg => {
                    filled[last] = true;
                    mapping.mapped.push(MappedArgument {
                        argument: index,
                        parameter: last,
                    });
                }
                _ => mapping
                    .diagnostics
                    .push(ResolutionDiagnostic::TooManyArguments { argument: index }),
            }
            continue;
        }

        if let Some(name) = arg.name {
            seen_named = true;
            match params.iter().position(|p| p.name == name) {
                None => mapping
                    .diagnostics
                    .push(ResolutionDiagnostic::NamedParameterNotFound {
                        argument: index,
                        name,
                    }),
                Some(param) if filled[param] => {
                    mapping
                        .diagnostics
                        .push(ResolutionDiagnostic::ArgumentPassedTwice {
                            argument: index,
                            parameter: name,
                        });
                }
                Some(param) => {
                    filled[param] = true;
                    mapping.mapped.push(MappedArgument {
                        argument: index,
                        parameter: param,
                    });
                }
            }
            continue;
        }

        if seen_named {
            mapping
                .diagnostics
                .push(ResolutionDiagnostic::MixingNamedAndPositionalArguments { argument: index });
            continue;
        }

        // Skip parameters already bound by name.
        while next_positional < params.len()
            && filled[next_positional]
            && !params[next_positional].is_vararg
        {
            next_positional += 1;
        }
        let Some(param) = params.get(next_positional) else {
            mapping
                .diagnostics
                .push(ResolutionDiagnostic::TooManyArguments { argument: index });
            continue;
        };
        filled[next_positional] = true;
        mapping.mapped.push(MappedArgument {
            argument: index,
            parameter: next_positional,
        });
        if !param.is_vararg {
            next_positional += 1;
        }
    }

    for (param, was_filled) in params.iter().zip(&filled) {
        if *was_filled || param.is_vararg {
            continue;
        }
        if param.has_default {
            mapping.defaults_used += 1;
        } else {
            mapping
                .diagnostics
                .push(ResolutionDiagnostic::NoValueForParameter {
                    parameter: param.name,
                });
        }
    }
    mapping
}

#[cfg(test)]
#[path = "../tests/arguments_tests.rs"]
mod arguments_tests;
