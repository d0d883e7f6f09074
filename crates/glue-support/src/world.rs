//! The per-scenario World
use glue_attach::{AttachmentData, AttachmentManager, AttachmentTask};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// Lets step code recover its concrete World type
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Context object created once per scenario and passed to every step and hook
pub trait World: AsAny + Send + 'static {}

impl dyn World {
    pub fn downcast_ref<T: World>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: World>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Handed to the World constructor by the runtime
#[derive(Debug, Clone)]
pub struct WorldOptions {
    pub attach: AttachmentManager,
    pub parameters: Value,
}

pub type WorldConstructor = Arc<dyn Fn(WorldOptions) -> Box<dyn World> + Send + Sync>;

/// Wrap a constructor of a concrete World type
pub fn world_constructor<F, W>(f: F) -> WorldConstructor
where
    F: Fn(WorldOptions) -> W + Send + Sync + 'static,
    W: World,
{
    Arc::new(move |options| Box::new(f(options)) as Box<dyn World>)
}

/// Used when no constructor was registered: exposes `attach` and `parameters`
#[derive(Debug, Clone)]
pub struct DefaultWorld {
    pub attach: AttachmentManager,
    pub parameters: Value,
}

impl World for DefaultWorld {}

impl DefaultWorld {
    pub fn new(options: WorldOptions) -> Self {
        Self {
            attach: options.attach,
            parameters: options.parameters,
        }
    }

    pub fn attach(&self, data: impl Into<AttachmentData>, media_type: Option<&str>) -> AttachmentTask {
        self.attach.create(data, media_type)
    }
}

pub fn default_world_constructor() -> WorldConstructor {
    world_constructor(DefaultWorld::new)
}
