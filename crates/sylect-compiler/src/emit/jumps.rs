//! Label frames for structured control flow.
//!
//! Conditionals and loops push a frame holding their labels and pop it when
//! they close. Frames nest strictly; `break` and `continue` resolve against
//! the innermost open loop, skipping any conditionals in between.

use sylect_classfile::Label;
use thiserror::Error;

/// Labels of an open `if`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalFrame {
    /// Start of the else branch, if there is one.
    pub else_label: Option<Label>,
    pub end_label: Label,
}

/// Labels of an open loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopFrame {
    /// Condition re-test.
    pub start: Label,
    /// Target of `continue`: the each block, or `start` without one.
    pub continue_label: Label,
    /// Target of `break`.
    pub end: Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Conditional(ConditionalFrame),
    Loop(LoopFrame),
}

/// Misuse of the frame stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("break or continue outside of a loop")]
    NotInLoop,
    #[error("no open {expected} to close")]
    Mismatched { expected: &'static str },
    #[error("{open} control-flow frame(s) left open")]
    Unclosed { open: usize },
}

#[derive(Debug, Default)]
pub struct JumpManager {
    frames: Vec<Frame>,
}

impl JumpManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_conditional(&mut self, frame: ConditionalFrame) {
        self.frames.push(Frame::Conditional(frame));
    }

    /// The innermost frame, if it is a conditional.
    pub fn current_conditional(&self) -> Result<ConditionalFrame, FrameError> {
        match self.frames.last() {
            Some(Frame::Conditional(frame)) => Ok(*frame),
            _ => Err(FrameError::Mismatched {
                expected: "conditional",
            }),
        }
    }

    pub fn pop_conditional(&mut self) -> Result<ConditionalFrame, FrameError> {
        let frame = self.current_conditional()?;
        self.frames.pop();
        Ok(frame)
    }

    pub fn push_loop(&mut self, frame: LoopFrame) {
        self.frames.push(Frame::Loop(frame));
    }

    pub fn pop_loop(&mut self) -> Result<LoopFrame, FrameError> {
        match self.frames.last() {
            Some(Frame::Loop(frame)) => {
                let frame = *frame;
                self.frames.pop();
                Ok(frame)
            }
            _ => Err(FrameError::Mismatched { expected: "loop" }),
        }
    }

    /// The nearest enclosing loop.
    pub fn innermost_loop(&self) -> Result<LoopFrame, FrameError> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| match frame {
                Frame::Loop(frame) => Some(*frame),
                Frame::Conditional(_) => None,
            })
            .ok_or(FrameError::NotInLoop)
    }

    pub fn in_loop(&self) -> bool {
        self.innermost_loop().is_ok()
    }

    pub fn loop_depth(&self) -> usize {
        self.frames
            .iter()
            .filter(|frame| matches!(frame, Frame::Loop(_)))
            .count()
    }

    /// Open frames of either kind.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
