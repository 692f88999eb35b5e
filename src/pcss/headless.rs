//! In-memory host services
//!
//! CPU-only implementations of the host traits. Headless hosts use them
//! directly; GPU hosts reuse [`HeadlessLight`] and [`GlobalShaderState`] as
//! the bookkeeping side of their wgpu backends.

use std::collections::{BTreeMap, HashMap, HashSet};

use glam::Vec4;

use crate::error::{PcssError, Result};
use crate::pcss::commands::{CommandBuffer, LightEvent};
use crate::pcss::config::FilterMode;
use crate::pcss::globals::{ShaderGlobals, TextureRef};
use crate::pcss::light::ShadowLight;
use crate::pcss::resource::{RenderTargetAllocator, TargetDescriptor, TargetHandle};

/// Allocator that hands out handles without touching a GPU.
///
/// Keeps per-handle release counts so double releases are observable.
#[derive(Debug, Default)]
pub struct HeadlessAllocator {
    next_handle: u64,
    max_resolution: Option<u32>,
    live: BTreeMap<TargetHandle, TargetDescriptor>,
    releases: HashMap<TargetHandle, u32>,
    allocations: u64,
}

impl HeadlessAllocator {
    /// Create an allocator that accepts every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator that rejects targets larger than `max_resolution`.
    pub fn with_max_resolution(max_resolution: u32) -> Self {
        Self {
            max_resolution: Some(max_resolution),
            ..Self::default()
        }
    }

    /// Change the size limit; `None` removes it.
    pub fn set_max_resolution(&mut self, max_resolution: Option<u32>) {
        self.max_resolution = max_resolution;
    }

    /// Total successful allocations.
    pub fn allocation_count(&self) -> u64 {
        self.allocations
    }

    /// Number of times `handle` was released.
    pub fn release_count(&self, handle: TargetHandle) -> u32 {
        self.releases.get(&handle).copied().unwrap_or(0)
    }

    /// Number of live targets.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Descriptor of a live target.
    pub fn descriptor(&self, handle: TargetHandle) -> Option<&TargetDescriptor> {
        self.live.get(&handle)
    }

    /// Filter mode of a live target.
    pub fn filter_mode(&self, handle: TargetHandle) -> Option<FilterMode> {
        self.live.get(&handle).map(|desc| desc.filter_mode)
    }
}

impl RenderTargetAllocator for HeadlessAllocator {
    fn allocate(&mut self, descriptor: &TargetDescriptor) -> Result<TargetHandle> {
        if let Some(max) = self.max_resolution {
            if descriptor.resolution > max {
                return Err(PcssError::ResourceAllocation {
                    resolution: descriptor.resolution,
                    format: descriptor.format,
                    samples: descriptor.anti_aliasing.samples(),
                    reason: format!("exceeds maximum resolution {max}"),
                });
            }
        }

        self.next_handle += 1;
        let handle = TargetHandle(self.next_handle);
        self.live.insert(handle, *descriptor);
        self.allocations += 1;
        Ok(handle)
    }

    fn release(&mut self, handle: TargetHandle) {
        self.live.remove(&handle);
        *self.releases.entry(handle).or_default() += 1;
    }

    fn set_filter_mode(&mut self, handle: TargetHandle, filter_mode: FilterMode) -> Result<()> {
        let descriptor = self
            .live
            .get_mut(&handle)
            .ok_or(PcssError::UnknownTarget(handle))?;
        descriptor.filter_mode = filter_mode;
        Ok(())
    }
}

/// A value stored in [`GlobalShaderState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GlobalValue {
    /// Integer global.
    Int(i32),
    /// Float global.
    Float(f32),
    /// Vector global.
    Vector(Vec4),
    /// Texture global.
    Texture(TextureRef),
}

/// In-memory shader-global namespace with last-writer-wins semantics.
#[derive(Debug, Default)]
pub struct GlobalShaderState {
    values: HashMap<String, GlobalValue>,
    keywords: HashSet<String>,
    writes: u64,
}

impl GlobalShaderState {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value of a global.
    pub fn get(&self, name: &str) -> Option<GlobalValue> {
        self.values.get(name).copied()
    }

    /// Integer value of a global.
    pub fn int(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            GlobalValue::Int(value) => Some(value),
            _ => None,
        }
    }

    /// Float value of a global.
    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            GlobalValue::Float(value) => Some(value),
            _ => None,
        }
    }

    /// Vector value of a global.
    pub fn vector(&self, name: &str) -> Option<Vec4> {
        match self.get(name)? {
            GlobalValue::Vector(value) => Some(value),
            _ => None,
        }
    }

    /// Texture bound to a global slot.
    pub fn texture(&self, name: &str) -> Option<TextureRef> {
        match self.get(name)? {
            GlobalValue::Texture(value) => Some(value),
            _ => None,
        }
    }

    /// Whether a keyword is enabled.
    pub fn keyword_enabled(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword)
    }

    /// Total writes received, keywords included.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    fn store(&mut self, name: &str, value: GlobalValue) {
        self.writes += 1;
        self.values.insert(name.to_string(), value);
    }
}

impl ShaderGlobals for GlobalShaderState {
    fn set_int(&mut self, name: &str, value: i32) {
        self.store(name, GlobalValue::Int(value));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.store(name, GlobalValue::Float(value));
    }

    fn set_vector(&mut self, name: &str, value: Vec4) {
        self.store(name, GlobalValue::Vector(value));
    }

    fn set_texture(&mut self, name: &str, texture: TextureRef) {
        self.store(name, GlobalValue::Texture(texture));
    }

    fn set_keyword(&mut self, keyword: &str, enabled: bool) {
        self.writes += 1;
        if enabled {
            self.keywords.insert(keyword.to_string());
        } else {
            self.keywords.remove(keyword);
        }
    }
}

/// Light that stores attached command buffers per event.
#[derive(Debug, Default)]
pub struct HeadlessLight {
    custom_resolution: u32,
    attached: Vec<(LightEvent, CommandBuffer)>,
}

impl HeadlessLight {
    /// Create a light with the host default resolution and nothing attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last custom shadow resolution; `0` means host default.
    pub fn custom_resolution(&self) -> u32 {
        self.custom_resolution
    }

    /// Buffers attached at `event`, in attachment order.
    pub fn command_buffers(&self, event: LightEvent) -> impl Iterator<Item = &CommandBuffer> {
        self.attached
            .iter()
            .filter(move |(at, _)| *at == event)
            .map(|(_, buffer)| buffer)
    }

    /// Buffer attached at `event` under `name`.
    pub fn command_buffer(&self, event: LightEvent, name: &str) -> Option<&CommandBuffer> {
        self.command_buffers(event).find(|buffer| buffer.name() == name)
    }
}

impl ShadowLight for HeadlessLight {
    fn set_shadow_custom_resolution(&mut self, resolution: u32) {
        self.custom_resolution = resolution;
    }

    fn add_command_buffer(&mut self, event: LightEvent, buffer: &CommandBuffer) {
        let existing = self
            .attached
            .iter_mut()
            .find(|(at, attached)| *at == event && attached.name() == buffer.name());
        match existing {
            Some((_, attached)) => attached.clone_from(buffer),
            None => self.attached.push((event, buffer.clone())),
        }
    }

    fn remove_command_buffer(&mut self, event: LightEvent, name: &str) {
        self.attached
            .retain(|(at, buffer)| !(*at == event && buffer.name() == name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcss::commands::RenderTextureId;
    use crate::pcss::config::PcssConfig;

    #[test]
    fn test_allocator_tracks_releases() {
        let mut alloc = HeadlessAllocator::new();
        let desc = TargetDescriptor::from_config(&PcssConfig::default());

        let a = alloc.allocate(&desc).unwrap();
        let b = alloc.allocate(&desc).unwrap();
        assert_ne!(a, b);
        assert_eq!(alloc.live_count(), 2);

        alloc.release(a);
        assert_eq!(alloc.release_count(a), 1);
        assert_eq!(alloc.release_count(b), 0);
        assert!(alloc.set_filter_mode(a, FilterMode::Point).is_err());
    }

    #[test]
    fn test_globals_last_writer_wins() {
        let mut globals = GlobalShaderState::new();
        globals.set_float("Softness", 1.0);
        globals.set_float("Softness", 2.0);
        globals.set_keyword("POISSON_32", true);
        globals.set_keyword("POISSON_32", false);

        assert_eq!(globals.float("Softness"), Some(2.0));
        assert_eq!(globals.int("Softness"), None);
        assert!(!globals.keyword_enabled("POISSON_32"));
        assert_eq!(globals.write_count(), 4);
    }

    #[test]
    fn test_light_replaces_buffer_by_name() {
        let mut light = HeadlessLight::new();
        let mut buffer = CommandBuffer::new("copy");
        light.add_command_buffer(LightEvent::AfterShadowMap, &buffer);

        buffer.blit(
            RenderTextureId::CurrentActive,
            RenderTextureId::Target(TargetHandle(1)),
        );
        light.add_command_buffer(LightEvent::AfterShadowMap, &buffer);

        assert_eq!(light.command_buffers(LightEvent::AfterShadowMap).count(), 1);
        assert_eq!(
            light
                .command_buffer(LightEvent::AfterShadowMap, "copy")
                .map(|b| b.commands().len()),
            Some(1)
        );

        light.remove_command_buffer(LightEvent::AfterShadowMap, "copy");
        assert!(light.command_buffer(LightEvent::AfterShadowMap, "copy").is_none());
    }
}
