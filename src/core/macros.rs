//! Macro for the closed, string-labeled enums of the provisioning model.

use thiserror::Error;

/// A label that does not name any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind} '{label}'")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub label: String,
}

/// Generate a closed enum whose variants carry a human-readable label.
///
/// The label is used as the serde representation, for `Display`, and is
/// accepted by `FromStr`. The generated enum also gets an `ALL` constant
/// listing every variant in declaration order.
///
/// ```ignore
/// labeled_enum! {
///     pub enum Phase {
///         Booting => "Booting",
///         Running => "Running Workload",
///     }
/// }
/// ```
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $label:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $label)]
                $variant
            ),*
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            /// Label of this variant, identical to its wire representation.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::core::UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)*
                    other => Err($crate::core::UnknownLabel {
                        kind: stringify!($name),
                        label: other.to_string(),
                    }),
                }
            }
        }
    };
}
