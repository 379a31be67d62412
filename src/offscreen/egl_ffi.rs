#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_void};

pub type EGLBoolean = u32;
pub type EGLint = i32;
pub type EGLDisplay = *mut c_void;
pub type EGLSurface = *mut c_void;

pub const EGL_TRUE: EGLBoolean = 1;

#[link(name = "EGL")]
unsafe extern "C" {
    pub fn eglSwapBuffers(dpy: EGLDisplay, surface: EGLSurface) -> EGLBoolean;
    pub fn eglGetError() -> EGLint;
    pub fn eglGetProcAddress(procname: *const c_char) -> *const c_void;
}
