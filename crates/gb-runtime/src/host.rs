use rhai::Engine;

/// Host-side surface registered on the engine when the interpreter starts:
/// custom types, their methods and free functions callable from guest code.
pub trait HostApi: Send + Sync {
    fn register(&self, engine: &mut Engine);
}

impl<F> HostApi for F
where
    F: Fn(&mut Engine) + Send + Sync,
{
    fn register(&self, engine: &mut Engine) {
        self(engine)
    }
}
