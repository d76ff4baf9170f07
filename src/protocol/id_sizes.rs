//! Negotiated ID widths.
//!
//! JDWP does not fix the byte width of its ID types; each connection
//! negotiates them once via `VirtualMachine.IDSizes` and every ID field on
//! the wire afterwards uses the negotiated width. [`IdSizes`] holds the five
//! widths and refuses use before negotiation.

use crate::error::{JdwpError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Widths {
    field: i32,
    method: i32,
    object: i32,
    reference_type: i32,
    frame: i32,
}

/// The five negotiated ID widths, each 4 or 8 bytes.
///
/// Starts out *unknown*; the session replaces it with a *known* instance
/// after the `IDSizes` reply. The accessors come in two flavors:
///
/// - the checked `*_size` methods return a protocol error while unknown,
///   for the decode path (a packet could in principle arrive before
///   negotiation finished);
/// - the `expect_*_size` methods panic while unknown, for the encode path,
///   where building an ID-bearing command before negotiation is a caller
///   bug, not a wire condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSizes {
    widths: Option<Widths>,
}

macro_rules! accessors {
    ($($field:ident: $checked:ident, $assert:ident);* $(;)?) => {
        $(
            /// Checked accessor; protocol error while the sizes are unknown.
            pub fn $checked(&self) -> Result<i32> {
                match self.widths {
                    Some(w) => Ok(w.$field),
                    None => Err(JdwpError::Protocol(
                        "ID sizes not negotiated yet".to_string(),
                    )),
                }
            }

            /// Asserting accessor for the encode path.
            ///
            /// # Panics
            ///
            /// Panics while the sizes are unknown.
            pub fn $assert(&self) -> i32 {
                self.widths
                    .expect("ID sizes used before negotiation")
                    .$field
            }
        )*
    };
}

impl IdSizes {
    /// The initial, un-negotiated state.
    pub const fn new_unknown() -> Self {
        Self { widths: None }
    }

    /// A known instance from the five widths of the `IDSizes` reply, in
    /// wire order: field, method, object, reference type, frame.
    pub const fn new(field: i32, method: i32, object: i32, reference_type: i32, frame: i32) -> Self {
        Self {
            widths: Some(Widths {
                field,
                method,
                object,
                reference_type,
                frame,
            }),
        }
    }

    /// Whether negotiation has completed.
    pub const fn is_known(&self) -> bool {
        self.widths.is_some()
    }

    accessors! {
        field: field_size, expect_field_size;
        method: method_size, expect_method_size;
        object: object_size, expect_object_size;
        reference_type: reference_type_size, expect_reference_type_size;
        frame: frame_size, expect_frame_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_checked_accessor_errors() {
        let sizes = IdSizes::new_unknown();
        assert!(!sizes.is_known());
        let err = sizes.object_size().unwrap_err();
        assert!(err.to_string().contains("not negotiated"));
    }

    #[test]
    #[should_panic(expected = "ID sizes used before negotiation")]
    fn test_unknown_assert_accessor_panics() {
        let sizes = IdSizes::new_unknown();
        let _ = sizes.expect_object_size();
    }

    #[test]
    fn test_known_accessors_return_widths() {
        let sizes = IdSizes::new(4, 8, 8, 8, 4);
        assert!(sizes.is_known());
        assert_eq!(sizes.field_size().unwrap(), 4);
        assert_eq!(sizes.method_size().unwrap(), 8);
        assert_eq!(sizes.object_size().unwrap(), 8);
        assert_eq!(sizes.reference_type_size().unwrap(), 8);
        assert_eq!(sizes.frame_size().unwrap(), 4);
        assert_eq!(sizes.expect_method_size(), 8);
    }
}
