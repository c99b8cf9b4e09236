use thiserror::Error;

/// Convenience alias for operations that can fault the machine.
pub type Result<T> = std::result::Result<T, Fault>;

/// A condition the running program drove the machine into that execution
/// cannot continue past. The instruction that raised it has not altered any
/// state; the program counter still addresses it.
#[derive(Error, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Fault {
    /// A `CALL` was executed with all sixteen stack slots in use.
    #[error("stack overflow on call at {pc:#06X}")]
    StackOverflow { pc: usize },

    /// A `RETURN` was executed with no saved address on the stack.
    #[error("stack underflow on return at {pc:#06X}")]
    StackUnderflow { pc: usize },

    /// An instruction addressed memory beyond the 4 KiB space.
    #[error("memory access out of range at {addr:#06X}")]
    AddressOutOfRange { addr: usize },
}
