// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Variable scope for a single render invocation.
//!
//! A [`Scope`] borrows the caller's context immutably and layers owned frames
//! on top of it. Loop bodies push a frame per iteration; assignments write to
//! the innermost frame that already holds the name. The borrowed base context
//! is never written, so rendering cannot leak changes back to the caller.

use crate::engine::Context;
use serde_json::Value;

/// Frame stack over a borrowed base context.
#[derive(Debug)]
pub struct Scope<'a> {
    base: &'a Context,
    frames: Vec<Context>,
}

impl<'a> Scope<'a> {
    /// Creates a scope with one empty frame over `base`.
    pub fn new(base: &'a Context) -> Self {
        Self {
            base,
            frames: vec![Context::new()],
        }
    }

    /// Looks a name up, innermost frame first.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.base.get(name))
    }

    /// Returns true when the name is bound anywhere in the scope.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Pushes a fresh frame.
    pub fn push(&mut self) {
        self.frames.push(Context::new());
    }

    /// Pops the innermost frame. The bottom frame is never removed.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Binds a name in the innermost frame.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Updates an existing binding, or defines the name in the innermost frame.
    ///
    /// A name that only exists in the base context is shadowed in the bottom
    /// frame, so the new value outlives any loop frame it was assigned from.
    pub fn assign(&mut self, name: &str, value: Value) {
        let in_base = self.base.contains_key(name);
        let target = match self.frames.iter().rev().position(|frame| frame.contains_key(name)) {
            Some(from_top) => self.frames.len() - 1 - from_top,
            None if in_base => 0,
            None => self.frames.len() - 1,
        };
        if let Some(frame) = self.frames.get_mut(target) {
            frame.insert(name.to_string(), value);
        }
    }

    /// Returns every visible binding as a single owned context.
    ///
    /// Inner frames shadow outer ones. Used to build the context handed to
    /// includes and components.
    pub fn flatten(&self) -> Context {
        let mut merged = self.base.clone();
        for frame in &self.frames {
            for (key, value) in frame {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(value: Value) -> Context {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_frames_shadow_base() {
        let base = context(json!({"name": "base", "other": 1}));
        let mut scope = Scope::new(&base);
        scope.push();
        scope.define("name", json!("loop"));

        assert_eq!(scope.get("name"), Some(&json!("loop")));
        assert_eq!(scope.get("other"), Some(&json!(1)));

        scope.pop();
        assert_eq!(scope.get("name"), Some(&json!("base")));
    }

    #[test]
    fn test_assign_updates_existing_binding() {
        let base = Context::new();
        let mut scope = Scope::new(&base);
        scope.define("total", json!(0));
        scope.push();
        scope.assign("total", json!(5));
        scope.assign("local", json!(true));
        scope.pop();

        assert_eq!(scope.get("total"), Some(&json!(5)));
        assert_eq!(scope.get("local"), None);
    }

    #[test]
    fn test_assign_never_touches_base() {
        let base = context(json!({"count": 1}));
        let mut scope = Scope::new(&base);
        scope.assign("count", json!(2));

        assert_eq!(scope.get("count"), Some(&json!(2)));
        assert_eq!(base.get("count"), Some(&json!(1)));
    }

    #[test]
    fn test_assign_to_base_name_outlives_loop_frame() {
        let base = context(json!({"total": 0}));
        let mut scope = Scope::new(&base);
        scope.push();
        scope.assign("total", json!(3));
        scope.pop();

        assert_eq!(scope.get("total"), Some(&json!(3)));
    }

    #[test]
    fn test_flatten_merges_frames() {
        let base = context(json!({"a": 1, "b": 1}));
        let mut scope = Scope::new(&base);
        scope.push();
        scope.define("b", json!(2));
        scope.define("c", json!(3));

        assert_eq!(Value::Object(scope.flatten()), json!({"a": 1, "b": 2, "c": 3}));
    }

    #[test]
    fn test_bottom_frame_survives_pop() {
        let base = Context::new();
        let mut scope = Scope::new(&base);
        scope.pop();
        scope.define("x", json!(1));
        assert!(scope.contains("x"));
    }
}
