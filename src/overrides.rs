//! Per-entity material parameter overrides.
//!
//! A [`MaterialOverrides`] block sits on a renderable entity and carries named
//! shader parameters that take precedence over the shared material asset. The
//! render side reads the block by name; this crate only writes it.

use std::collections::HashMap;

use bevy::prelude::*;

/// Shader-facing parameter names written by an effector.
pub mod names {
    pub const DENSITY: &str = "Density";
    pub const SPEED: &str = "Speed";
    pub const EFFECTOR_RANGE: &str = "EffectorRange";
    pub const EFFECTOR_OFFSET: &str = "EffectorOffset";
    pub const EFFECTOR_MATRIX: &str = "EffectorMatrix";
    pub const EFFECTOR_COLOR: &str = "EffectorColor";
    pub const LOCAL_TIME: &str = "LocalTime";

    /// Every name an effector writes, in write order.
    pub const ALL: [&str; 7] = [
        DENSITY,
        SPEED,
        EFFECTOR_RANGE,
        EFFECTOR_OFFSET,
        EFFECTOR_MATRIX,
        EFFECTOR_COLOR,
        LOCAL_TIME,
    ];
}

/// A single overridden shader value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShaderParam {
    Float(f32),
    Color(LinearRgba),
    Matrix(Mat4),
}

impl ShaderParam {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<LinearRgba> {
        match self {
            Self::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<Mat4> {
        match self {
            Self::Matrix(m) => Some(*m),
            _ => None,
        }
    }
}

/// Named shader parameter overrides for one renderable entity.
#[derive(Component, Clone, Debug, Default, PartialEq)]
pub struct MaterialOverrides {
    params: HashMap<String, ShaderParam>,
}

impl MaterialOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set(name, ShaderParam::Float(value));
    }

    pub fn set_color(&mut self, name: &str, color: LinearRgba) {
        self.set(name, ShaderParam::Color(color));
    }

    pub fn set_matrix(&mut self, name: &str, matrix: Mat4) {
        self.set(name, ShaderParam::Matrix(matrix));
    }

    fn set(&mut self, name: &str, param: ShaderParam) {
        // Avoid reallocating the key on every frame once it exists.
        if let Some(slot) = self.params.get_mut(name) {
            *slot = param;
        } else {
            self.params.insert(name.to_string(), param);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ShaderParam> {
        self.params.get(name)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(ShaderParam::as_float)
    }

    pub fn color(&self, name: &str) -> Option<LinearRgba> {
        self.get(name).and_then(ShaderParam::as_color)
    }

    pub fn matrix(&self, name: &str) -> Option<Mat4> {
        self.get(name).and_then(ShaderParam::as_matrix)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.params.clear();
    }
}
