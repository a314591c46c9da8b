pub mod emitter;
pub mod record;
