use std::ptr::NonNull;

use super::egl_ffi::{self, EGLDisplay, EGLSurface};
use super::{Error, OffscreenTarget, Result, NUM_BUFFERS};

/// A GBM buffer object owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferObject(NonNull<gbm_sys::gbm_bo>);

impl BufferObject {
    pub fn as_raw(self) -> *mut gbm_sys::gbm_bo {
        self.0.as_ptr()
    }
}

enum Presentation {
    Surface {
        gbm: NonNull<gbm_sys::gbm_surface>,
        egl: EGLSurface,
    },
    Buffers {
        bos: [*mut gbm_sys::gbm_bo; NUM_BUFFERS],
        fbs: [u32; NUM_BUFFERS],
    },
}

/// [`OffscreenTarget`] over an already initialized GBM/EGL/GL stack.
///
/// None of the handles are owned: the caller keeps the GBM device, surface, buffer objects and
/// the EGL display alive for as long as this target is used, and destroys them afterwards.
pub struct GbmEglTarget {
    gl: gl46::GlFns,
    display: EGLDisplay,
    presentation: Presentation,
}

impl GbmEglTarget {
    /// Present every frame through a GBM surface.
    ///
    /// # Safety
    ///
    /// `display` must be an initialized EGL display and `egl_surface` a window surface created on
    /// it for `gbm_surface`. A GL context rendering to `egl_surface` must be current on this
    /// thread.
    pub unsafe fn with_surface(
        display: EGLDisplay,
        gbm_surface: NonNull<gbm_sys::gbm_surface>,
        egl_surface: EGLSurface,
    ) -> Result<Self> {
        Ok(Self {
            gl: unsafe { load_gl()? },
            display,
            presentation: Presentation::Surface {
                gbm: gbm_surface,
                egl: egl_surface,
            },
        })
    }

    /// Render into a fixed pool of buffer objects. `fbs[i]` is the GL framebuffer backed by
    /// `bos[i]`.
    ///
    /// # Safety
    ///
    /// `display` must be an initialized EGL display with a current GL context on this thread, and
    /// every non-zero entry of `fbs` a framebuffer object of that context.
    pub unsafe fn with_buffers(
        display: EGLDisplay,
        bos: [*mut gbm_sys::gbm_bo; NUM_BUFFERS],
        fbs: [u32; NUM_BUFFERS],
    ) -> Result<Self> {
        Ok(Self {
            gl: unsafe { load_gl()? },
            display,
            presentation: Presentation::Buffers { bos, fbs },
        })
    }
}

unsafe fn load_gl() -> Result<gl46::GlFns> {
    unsafe { gl46::GlFns::load_from(&|name| egl_ffi::eglGetProcAddress(name.cast())) }
        .map_err(Error::GlLoad)
}

impl OffscreenTarget for GbmEglTarget {
    type Buffer = BufferObject;

    fn has_surface(&self) -> bool {
        matches!(self.presentation, Presentation::Surface { .. })
    }

    fn bind_slot(&mut self, slot: usize) {
        let Presentation::Buffers { fbs, .. } = &self.presentation else {
            return;
        };
        if let Some(&fb) = fbs.get(slot) {
            unsafe { self.gl.BindFramebuffer(gl46::GL_FRAMEBUFFER, fb) };
        }
    }

    fn swap_buffers(&mut self) -> Result<()> {
        let Presentation::Surface { egl, .. } = self.presentation else {
            return Ok(());
        };
        if unsafe { egl_ffi::eglSwapBuffers(self.display, egl) } != egl_ffi::EGL_TRUE {
            return Err(Error::SwapBuffers(unsafe { egl_ffi::eglGetError() }));
        }
        Ok(())
    }

    fn lock_front_buffer(&mut self) -> Option<BufferObject> {
        let Presentation::Surface { gbm, .. } = self.presentation else {
            return None;
        };
        NonNull::new(unsafe { gbm_sys::gbm_surface_lock_front_buffer(gbm.as_ptr()) })
            .map(BufferObject)
    }

    fn release_buffer(&mut self, buffer: BufferObject) {
        if let Presentation::Surface { gbm, .. } = self.presentation {
            unsafe { gbm_sys::gbm_surface_release_buffer(gbm.as_ptr(), buffer.as_raw()) };
        }
    }

    fn finish(&mut self) {
        unsafe { self.gl.Finish() };
    }

    fn slot_buffer(&self, slot: usize) -> Option<BufferObject> {
        match &self.presentation {
            Presentation::Buffers { bos, .. } => NonNull::new(*bos.get(slot)?).map(BufferObject),
            Presentation::Surface { .. } => None,
        }
    }
}
