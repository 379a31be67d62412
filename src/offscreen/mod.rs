//! Rendering frames into GBM buffer objects without scanning them out.
//!
//! The graphics stack (GBM device, EGL context, buffer allocation) is set up by the caller.
//! [`run`] only drives the frame loop: draw, then either swap and lock the front buffer of a GBM
//! surface, or finish rendering into one of [`NUM_BUFFERS`] preallocated buffer objects.

use crate::fps::FrameCounter;

mod egl_ffi;
mod gbm;

pub use gbm::{BufferObject, GbmEglTarget};

/// Size of the buffer object pool used when there is no GBM surface.
pub const NUM_BUFFERS: usize = 2;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no buffer object available for frame {0}")]
    BufferAcquisition(u32),
    #[error("eglSwapBuffers failed with EGL error {0:#x}")]
    SwapBuffers(i32),
    #[error("failed to load GL functions: {0}")]
    GlLoad(&'static str),
}

/// What the frame loop renders into.
pub trait OffscreenTarget {
    type Buffer;

    /// Whether frames go through a presentation surface. Queried once per run.
    fn has_surface(&self) -> bool;

    /// Direct rendering to the buffer object in `slot`. Used only without a surface.
    fn bind_slot(&mut self, slot: usize);

    /// Used only with a surface.
    fn swap_buffers(&mut self) -> Result<()>;

    /// Used only with a surface. The buffer stays locked until [`release_buffer`] is called.
    ///
    /// [`release_buffer`]: Self::release_buffer
    fn lock_front_buffer(&mut self) -> Option<Self::Buffer>;

    /// Used only with a surface.
    fn release_buffer(&mut self, buffer: Self::Buffer);

    /// Block until rendering has completed. Used only without a surface.
    fn finish(&mut self);

    /// Used only without a surface.
    fn slot_buffer(&self, slot: usize) -> Option<Self::Buffer>;
}

/// Render `frame_count` frames, calling `draw` with each frame index.
pub fn run<T: OffscreenTarget>(
    target: &mut T,
    draw: &mut dyn FnMut(u32),
    frame_count: u32,
) -> Result<()> {
    let surface = target.has_surface();
    let mut held: Option<T::Buffer> = None;
    let mut fps = FrameCounter::start();

    for frame in 0..frame_count {
        let slot = frame as usize % NUM_BUFFERS;

        if !surface {
            target.bind_slot(slot);
        }

        draw(frame);

        let next = if surface {
            if let Err(e) = target.swap_buffers() {
                release_held(target, surface, held);
                return Err(e);
            }
            target.lock_front_buffer()
        } else {
            target.finish();
            target.slot_buffer(slot)
        };
        let Some(next) = next else {
            if surface {
                log::error!("offscreen: failed to lock frontbuffer on frame {frame}");
            } else {
                log::error!("offscreen: no buffer object in slot {slot} on frame {frame}");
            }
            release_held(target, surface, held);
            return Err(Error::BufferAcquisition(frame));
        };

        fps.end_frame();

        // Give the previous buffer back so the driver may render into it again.
        if let Some(prev) = held.replace(next) {
            if surface {
                target.release_buffer(prev);
            }
        }
    }

    release_held(target, surface, held);
    fps.finish();
    Ok(())
}

fn release_held<T: OffscreenTarget>(target: &mut T, surface: bool, held: Option<T::Buffer>) {
    if let Some(buf) = held {
        if surface {
            target.release_buffer(buf);
        }
    }
}
