//! Cursor stack and the guard that keeps push/pop balanced.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    Arrow,
    Crosshair,
}

/// A system cursor with a single "set" slot plus a push/pop stack on top.
pub trait CursorStack: Send + Sync {
    /// Shape currently shown.
    fn current(&self) -> CursorShape;
    /// Replace the base slot.
    fn set(&self, shape: CursorShape);
    fn push(&self, shape: CursorShape);
    /// False if nothing was pushed.
    fn pop(&self) -> bool;
    /// Drop every pushed shape and show the arrow.
    fn reset(&self);
    fn depth(&self) -> usize;
}

/// Pushes a shape on acquire and pops it exactly once, on release or drop.
pub struct CursorGuard {
    stack: Arc<dyn CursorStack>,
    armed: bool,
}

impl CursorGuard {
    pub fn acquire(stack: Arc<dyn CursorStack>, shape: CursorShape) -> Self {
        stack.push(shape);
        Self { stack, armed: true }
    }

    pub fn release(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if !std::mem::take(&mut self.armed) {
            return;
        }
        if !self.stack.pop() {
            log::warn!("[SELECT] Cursor stack underflow, resetting cursor");
            self.stack.reset();
        }
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

struct Shapes {
    base: CursorShape,
    pushed: Vec<CursorShape>,
}

impl Shapes {
    fn top(&self) -> CursorShape {
        self.pushed.last().copied().unwrap_or(self.base)
    }
}

/// In-process cursor stack that forwards the visible shape to `apply`.
///
/// `apply` runs only when the visible shape changes.
pub struct ShapeStack<F: Fn(CursorShape) + Send + Sync> {
    shapes: Mutex<Shapes>,
    apply: F,
}

impl<F: Fn(CursorShape) + Send + Sync> ShapeStack<F> {
    pub fn new(apply: F) -> Self {
        Self {
            shapes: Mutex::new(Shapes {
                base: CursorShape::Arrow,
                pushed: Vec::new(),
            }),
            apply,
        }
    }

    fn mutate(&self, change: impl FnOnce(&mut Shapes) -> bool) -> bool {
        let (result, before, after) = {
            let mut shapes = match self.shapes.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let before = shapes.top();
            let result = change(&mut shapes);
            (result, before, shapes.top())
        };
        if before != after {
            (self.apply)(after);
        }
        result
    }
}

impl<F: Fn(CursorShape) + Send + Sync> CursorStack for ShapeStack<F> {
    fn current(&self) -> CursorShape {
        match self.shapes.lock() {
            Ok(shapes) => shapes.top(),
            Err(poisoned) => poisoned.into_inner().top(),
        }
    }

    fn set(&self, shape: CursorShape) {
        self.mutate(|s| {
            s.base = shape;
            true
        });
    }

    fn push(&self, shape: CursorShape) {
        self.mutate(|s| {
            s.pushed.push(shape);
            true
        });
    }

    fn pop(&self) -> bool {
        self.mutate(|s| s.pushed.pop().is_some())
    }

    fn reset(&self) {
        self.mutate(|s| {
            s.pushed.clear();
            s.base = CursorShape::Arrow;
            true
        });
    }

    fn depth(&self) -> usize {
        match self.shapes.lock() {
            Ok(shapes) => shapes.pushed.len(),
            Err(poisoned) => poisoned.into_inner().pushed.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Applied = Arc<Mutex<Vec<CursorShape>>>;

    fn stack() -> (Arc<ShapeStack<impl Fn(CursorShape) + Send + Sync>>, Applied) {
        let applied = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&applied);
        let stack = Arc::new(ShapeStack::new(move |shape| sink.lock().unwrap().push(shape)));
        (stack, applied)
    }

    #[test]
    fn guard_pops_on_drop() {
        let (stack, _) = stack();
        {
            let _guard = CursorGuard::acquire(stack.clone(), CursorShape::Crosshair);
            assert_eq!(stack.depth(), 1);
            assert_eq!(stack.current(), CursorShape::Crosshair);
        }
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.current(), CursorShape::Arrow);
    }

    #[test]
    fn explicit_release_pops_once() {
        let (stack, _) = stack();
        stack.push(CursorShape::Arrow);
        let guard = CursorGuard::acquire(stack.clone(), CursorShape::Crosshair);
        guard.release();
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn underflow_falls_back_to_reset() {
        let (stack, _) = stack();
        stack.set(CursorShape::Crosshair);
        let guard = CursorGuard::acquire(stack.clone(), CursorShape::Crosshair);
        // something else cleared the stack underneath us
        stack.pop();
        guard.release();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.current(), CursorShape::Arrow);
    }

    #[test]
    fn apply_runs_only_on_visible_change() {
        let (stack, applied) = stack();
        stack.set(CursorShape::Crosshair);
        stack.push(CursorShape::Crosshair);
        stack.pop();
        stack.set(CursorShape::Arrow);
        assert_eq!(
            *applied.lock().unwrap(),
            vec![CursorShape::Crosshair, CursorShape::Arrow]
        );
    }
}
