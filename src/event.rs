//! Event request vocabulary: kinds, suspend policies, modifiers.
//!
//! An event request tells the VM to report (and optionally suspend on)
//! matching activity. Requests carry zero or more typed modifiers that
//! narrow the selection; each modifier serializes as its kind byte followed
//! by its fields.

use crate::protocol::CommandBuilder;
use crate::types::{FieldID, MethodID, ObjectID, ReferenceTypeID, ThreadID, TypeTag};

/// Kind of event a request subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    SingleStep = 1,
    Breakpoint = 2,
    FramePop = 3,
    Exception = 4,
    UserDefined = 5,
    ThreadStart = 6,
    ThreadDeath = 7,
    ClassPrepare = 8,
    ClassUnload = 9,
    ClassLoad = 10,
    FieldAccess = 20,
    FieldModification = 21,
    ExceptionCatch = 30,
    MethodEntry = 40,
    MethodExit = 41,
    MethodExitWithReturnValue = 42,
    MonitorContendedEnter = 43,
    MonitorContendedEntered = 44,
    MonitorWait = 45,
    MonitorWaited = 46,
    VmStart = 90,
    VmDeath = 99,
}

impl EventKind {
    /// The wire byte for this event kind.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// What the VM suspends when a requested event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SuspendPolicy {
    /// Suspend nothing.
    None = 0,
    /// Suspend only the thread the event occurred in.
    EventThread = 1,
    /// Suspend the whole VM.
    All = 2,
}

impl SuspendPolicy {
    /// The wire byte for this policy.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Granularity of a single-step request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum StepSize {
    /// Step by the minimum possible amount (one bytecode instruction).
    Min = 0,
    /// Step to the next source line.
    Line = 1,
}

/// Call-stack relation of a single-step request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum StepDepth {
    /// Step into any called methods.
    Into = 0,
    /// Step over any called methods.
    Over = 1,
    /// Step out of the current method.
    Out = 2,
}

/// Wire kind bytes of the modifiers.
pub mod modifier_kinds {
    pub const COUNT: u8 = 1;
    pub const THREAD_ONLY: u8 = 3;
    pub const CLASS_ONLY: u8 = 4;
    pub const CLASS_MATCH: u8 = 5;
    pub const CLASS_EXCLUDE: u8 = 6;
    pub const LOCATION_ONLY: u8 = 7;
    pub const EXCEPTION_ONLY: u8 = 8;
    pub const FIELD_ONLY: u8 = 9;
    pub const STEP: u8 = 10;
    pub const INSTANCE_ONLY: u8 = 11;
    pub const SOURCE_NAME_MATCH: u8 = 12;
}

/// A filter attached to an event request.
///
/// The set is closed: these are exactly the modifier kinds JDWP defines,
/// so serialization is a single match rather than open polymorphism.
#[derive(Debug, Clone, PartialEq)]
pub enum EventModifier {
    /// Report the event after skipping `count - 1` occurrences, then
    /// disable the request.
    Count(i32),
    /// Only events in the given thread.
    ThreadOnly(ThreadID),
    /// Only events in the given reference type or its subtypes.
    ClassOnly(ReferenceTypeID),
    /// Only events in classes whose name matches the pattern. A leading or
    /// trailing `*` matches any prefix/suffix.
    ClassMatch(String),
    /// Only events in classes whose name does not match the pattern.
    ClassExclude(String),
    /// Only events at the given code location.
    LocationOnly {
        type_tag: TypeTag,
        class_id: ReferenceTypeID,
        method_id: MethodID,
        /// Code index within the method.
        index: u64,
    },
    /// Only exceptions of the given type (or any, when `None`), filtered by
    /// whether they are caught and/or uncaught.
    ExceptionOnly {
        exception: Option<ReferenceTypeID>,
        caught: bool,
        uncaught: bool,
    },
    /// Only access/modification of the given field.
    FieldOnly {
        declaring: ReferenceTypeID,
        field: FieldID,
    },
    /// Step events of the given granularity and depth in one thread.
    Step {
        thread: ThreadID,
        size: StepSize,
        depth: StepDepth,
    },
    /// Only events whose receiver is the given object.
    InstanceOnly(ObjectID),
    /// Only events in classes whose source name matches the pattern.
    SourceNameMatch(String),
}

impl EventModifier {
    /// The wire kind byte for this modifier.
    pub fn kind(&self) -> u8 {
        match self {
            EventModifier::Count(_) => modifier_kinds::COUNT,
            EventModifier::ThreadOnly(_) => modifier_kinds::THREAD_ONLY,
            EventModifier::ClassOnly(_) => modifier_kinds::CLASS_ONLY,
            EventModifier::ClassMatch(_) => modifier_kinds::CLASS_MATCH,
            EventModifier::ClassExclude(_) => modifier_kinds::CLASS_EXCLUDE,
            EventModifier::LocationOnly { .. } => modifier_kinds::LOCATION_ONLY,
            EventModifier::ExceptionOnly { .. } => modifier_kinds::EXCEPTION_ONLY,
            EventModifier::FieldOnly { .. } => modifier_kinds::FIELD_ONLY,
            EventModifier::Step { .. } => modifier_kinds::STEP,
            EventModifier::InstanceOnly(_) => modifier_kinds::INSTANCE_ONLY,
            EventModifier::SourceNameMatch(_) => modifier_kinds::SOURCE_NAME_MATCH,
        }
    }

    /// Serialize the kind byte and the modifier's fields into a command.
    pub fn serialize(&self, builder: &mut CommandBuilder) {
        builder.put_u8(self.kind());
        match self {
            EventModifier::Count(count) => {
                builder.put_i32(*count);
            }
            EventModifier::ThreadOnly(thread) => {
                builder.put_thread_id(*thread);
            }
            EventModifier::ClassOnly(class_id) => {
                builder.put_reference_type_id(*class_id);
            }
            EventModifier::ClassMatch(pattern)
            | EventModifier::ClassExclude(pattern)
            | EventModifier::SourceNameMatch(pattern) => {
                builder.put_string(pattern);
            }
            EventModifier::LocationOnly {
                type_tag,
                class_id,
                method_id,
                index,
            } => {
                builder
                    .put_u8(type_tag.as_u8())
                    .put_reference_type_id(*class_id)
                    .put_method_id(*method_id)
                    .put_u64(*index);
            }
            EventModifier::ExceptionOnly {
                exception,
                caught,
                uncaught,
            } => {
                builder
                    .put_reference_type_id(exception.unwrap_or(ReferenceTypeID::NULL))
                    .put_bool(*caught)
                    .put_bool(*uncaught);
            }
            EventModifier::FieldOnly { declaring, field } => {
                builder.put_reference_type_id(*declaring).put_field_id(*field);
            }
            EventModifier::Step {
                thread,
                size,
                depth,
            } => {
                builder
                    .put_thread_id(*thread)
                    .put_i32(*size as i32)
                    .put_i32(*depth as i32);
            }
            EventModifier::InstanceOnly(object) => {
                builder.put_object_id(*object);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{command_sets, event_request_commands, HEADER_SIZE, IdSizes};

    /// Serialize one modifier with 8-byte IDs and return its payload bytes.
    fn serialized(modifier: &EventModifier) -> Vec<u8> {
        let sizes = IdSizes::new(8, 8, 8, 8, 8);
        let mut builder = CommandBuilder::new(
            1,
            command_sets::EVENT_REQUEST,
            event_request_commands::SET,
            sizes,
        );
        modifier.serialize(&mut builder);
        builder.finish()[HEADER_SIZE..].to_vec()
    }

    #[test]
    fn test_count_layout() {
        let bytes = serialized(&EventModifier::Count(3));
        assert_eq!(bytes, [modifier_kinds::COUNT, 0, 0, 0, 3]);
    }

    #[test]
    fn test_thread_only_layout() {
        let bytes = serialized(&EventModifier::ThreadOnly(ThreadID::new(0x10)));
        assert_eq!(bytes[0], modifier_kinds::THREAD_ONLY);
        assert_eq!(&bytes[1..], &[0, 0, 0, 0, 0, 0, 0, 0x10]);
    }

    #[test]
    fn test_class_match_and_exclude_layout() {
        let bytes = serialized(&EventModifier::ClassMatch("java.lang.*".to_string()));
        assert_eq!(bytes[0], modifier_kinds::CLASS_MATCH);
        assert_eq!(&bytes[1..5], &[0, 0, 0, 11]);
        assert_eq!(&bytes[5..], b"java.lang.*");

        let bytes = serialized(&EventModifier::ClassExclude("sun.*".to_string()));
        assert_eq!(bytes[0], modifier_kinds::CLASS_EXCLUDE);
    }

    #[test]
    fn test_location_only_layout() {
        let bytes = serialized(&EventModifier::LocationOnly {
            type_tag: TypeTag::Class,
            class_id: ReferenceTypeID::new(0x42),
            method_id: MethodID::new(0x43),
            index: 7,
        });
        assert_eq!(bytes[0], modifier_kinds::LOCATION_ONLY);
        assert_eq!(bytes[1], TypeTag::Class.as_u8());
        assert_eq!(&bytes[2..10], &[0, 0, 0, 0, 0, 0, 0, 0x42]);
        assert_eq!(&bytes[10..18], &[0, 0, 0, 0, 0, 0, 0, 0x43]);
        assert_eq!(&bytes[18..26], &[0, 0, 0, 0, 0, 0, 0, 7]);
    }

    #[test]
    fn test_exception_only_null_encodes_as_zero() {
        let bytes = serialized(&EventModifier::ExceptionOnly {
            exception: None,
            caught: true,
            uncaught: false,
        });
        assert_eq!(bytes[0], modifier_kinds::EXCEPTION_ONLY);
        assert_eq!(&bytes[1..9], &[0; 8]);
        assert_eq!(&bytes[9..], &[1, 0]);
    }

    #[test]
    fn test_field_only_layout() {
        let bytes = serialized(&EventModifier::FieldOnly {
            declaring: ReferenceTypeID::new(1),
            field: FieldID::new(2),
        });
        assert_eq!(bytes[0], modifier_kinds::FIELD_ONLY);
        assert_eq!(bytes.len(), 1 + 8 + 8);
    }

    #[test]
    fn test_step_layout() {
        let bytes = serialized(&EventModifier::Step {
            thread: ThreadID::new(5),
            size: StepSize::Line,
            depth: StepDepth::Over,
        });
        assert_eq!(bytes[0], modifier_kinds::STEP);
        assert_eq!(&bytes[1..9], &[0, 0, 0, 0, 0, 0, 0, 5]);
        assert_eq!(&bytes[9..13], &[0, 0, 0, 1]); // StepSize::Line
        assert_eq!(&bytes[13..17], &[0, 0, 0, 1]); // StepDepth::Over
    }

    #[test]
    fn test_instance_only_layout() {
        let bytes = serialized(&EventModifier::InstanceOnly(ObjectID::new(0xFF)));
        assert_eq!(bytes[0], modifier_kinds::INSTANCE_ONLY);
        assert_eq!(&bytes[1..], &[0, 0, 0, 0, 0, 0, 0, 0xFF]);
    }

    #[test]
    fn test_source_name_match_layout() {
        let bytes = serialized(&EventModifier::SourceNameMatch("Main.java".to_string()));
        assert_eq!(bytes[0], modifier_kinds::SOURCE_NAME_MATCH);
        assert_eq!(&bytes[5..], b"Main.java");
    }

    #[test]
    fn test_event_kind_wire_values() {
        assert_eq!(EventKind::SingleStep.as_u8(), 1);
        assert_eq!(EventKind::Breakpoint.as_u8(), 2);
        assert_eq!(EventKind::ClassPrepare.as_u8(), 8);
        assert_eq!(EventKind::FieldAccess.as_u8(), 20);
        assert_eq!(EventKind::MethodExitWithReturnValue.as_u8(), 42);
        assert_eq!(EventKind::VmStart.as_u8(), 90);
        assert_eq!(EventKind::VmDeath.as_u8(), 99);
    }

    #[test]
    fn test_suspend_policy_wire_values() {
        assert_eq!(SuspendPolicy::None.as_u8(), 0);
        assert_eq!(SuspendPolicy::EventThread.as_u8(), 1);
        assert_eq!(SuspendPolicy::All.as_u8(), 2);
    }
}
