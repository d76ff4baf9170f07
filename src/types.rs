//! Public data types: ID handles, type tags, class/method metadata.
//!
//! JDWP identifies everything in the target VM through opaque numeric IDs
//! whose byte width is negotiated per connection. The handles here carry the
//! full 64-bit payload; the protocol layer truncates or widens on the wire
//! according to the negotiated [`IdSizes`](crate::protocol::IdSizes).

use std::fmt::{self, Debug, Formatter};

use bitflags::bitflags;

use crate::error::JdwpError;

macro_rules! id_types {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(u64);

            impl $name {
                /// Wrap a raw ID value received from the VM.
                pub const fn new(raw: u64) -> Self {
                    Self(raw)
                }

                /// The raw 64-bit payload.
                pub const fn raw(self) -> u64 {
                    self.0
                }
            }

            impl Debug for $name {
                fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                    write!(f, concat!(stringify!($name), "({:#x})"), self.0)
                }
            }
        )*
    };
}

id_types! {
    /// Identifies an object in the target VM. Value 0 is the null object.
    ObjectID,
    /// Identifies a thread in the target VM.
    ThreadID,
    /// Identifies a loaded reference type (class, interface or array type).
    /// Value 0 is the null reference type.
    ReferenceTypeID,
    /// Identifies a method within its declaring reference type.
    MethodID,
    /// Identifies a field within its declaring reference type.
    FieldID,
    /// Identifies a stack frame in a suspended thread.
    FrameID,
}

impl ObjectID {
    /// The null object.
    pub const NULL: ObjectID = ObjectID(0);

    /// Whether this is the null object.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl ReferenceTypeID {
    /// The null reference type.
    pub const NULL: ReferenceTypeID = ReferenceTypeID(0);

    /// Whether this is the null reference type.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Identifies an installed event request. Returned by
/// [`Session::set_event_request`](crate::Session::set_event_request) and
/// consumed by [`Session::clear_event_request`](crate::Session::clear_event_request).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventRequestID(i32);

impl EventRequestID {
    /// Wrap a raw request ID received from the VM.
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw 32-bit payload.
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl Debug for EventRequestID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "EventRequestID({})", self.0)
    }
}

/// Kind of a reference type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeTag {
    /// A class type.
    Class = 1,
    /// An interface type.
    Interface = 2,
    /// An array type.
    Array = 3,
}

impl TypeTag {
    /// The wire byte for this tag.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TypeTag {
    type Error = JdwpError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TypeTag::Class),
            2 => Ok(TypeTag::Interface),
            3 => Ok(TypeTag::Array),
            other => Err(JdwpError::Protocol(format!("Invalid type tag: {other}"))),
        }
    }
}

bitflags! {
    /// Preparation state of a loaded class, as reported by the VM.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClassStatus: u32 {
        const VERIFIED = 1;
        const PREPARED = 2;
        const INITIALIZED = 4;
        const ERROR = 8;
    }
}

impl ClassStatus {
    /// Decode from the signed 32-bit wire value, keeping any bits future
    /// VMs may define.
    pub fn from_wire(raw: i32) -> Self {
        ClassStatus::from_bits_retain(raw as u32)
    }
}

/// A loaded class as returned by `VirtualMachine.ClassesBySignature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassInfo {
    /// Whether the type is a class, interface or array type.
    pub type_tag: TypeTag,
    /// The reference type ID for further commands.
    pub type_id: ReferenceTypeID,
    /// Verification/preparation/initialization state.
    pub status: ClassStatus,
}

/// A method of a reference type as returned by `ReferenceType.Methods`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// The method ID, valid together with its declaring type's ID.
    pub method_id: MethodID,
    /// The method name.
    pub name: String,
    /// The JNI signature, e.g. `(Ljava/lang/String;)V`.
    pub signature: String,
    /// The access modifier bit mask (`ACC_PUBLIC` etc.).
    pub mod_bits: i32,
}

/// Version information reported by `VirtualMachine.Version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Free-form description of the target VM.
    pub description: String,
    /// JDWP major version.
    pub jdwp_major: i32,
    /// JDWP minor version.
    pub jdwp_minor: i32,
    /// The target VM's java.version property.
    pub vm_version: String,
    /// The target VM's java.vm.name property.
    pub vm_name: String,
}
