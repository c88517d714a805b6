//! Headful runner: a winit window presenting the viewport's RGBA frame via
//! `pixels`, with keyboard events routed into a `KeyboardDevice`.

use std::error::Error;

use pixels::{PixelsBuilder, SurfaceTexture};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::canvas::RgbaCanvas;
use crate::keyboard::{Key, KeyboardDevice, Modifier};
use crate::viewport::ViewportDevice;

pub struct AppConfig {
    pub title: String,
    pub desired_size: PhysicalSize<u32>,
}

/// Maps a winit key to the device's key-identifier space, which uses
/// browser-style numeric key codes plus the four named modifiers. Keys with
/// no identifier in that space map to `None`.
pub fn key_from_winit(key: VirtualKeyCode) -> Option<Key> {
    use VirtualKeyCode as V;

    let code: u8 = match key {
        V::LShift | V::RShift => return Some(Key::Modifier(Modifier::Shift)),
        V::LControl | V::RControl => return Some(Key::Modifier(Modifier::Ctrl)),
        V::LAlt | V::RAlt => return Some(Key::Modifier(Modifier::Alt)),
        V::LWin | V::RWin => return Some(Key::Modifier(Modifier::Meta)),

        V::Return => 13,
        V::Escape => 27,
        V::Space => 32,
        V::PageUp => 33,
        V::PageDown => 34,
        V::End => 35,
        V::Home => 36,
        V::Left => 37,
        V::Up => 38,
        V::Right => 39,
        V::Down => 40,
        V::Insert => 45,
        V::Delete => 46,

        V::Key0 => 48,
        V::Key1 => 49,
        V::Key2 => 50,
        V::Key3 => 51,
        V::Key4 => 52,
        V::Key5 => 53,
        V::Key6 => 54,
        V::Key7 => 55,
        V::Key8 => 56,
        V::Key9 => 57,

        V::A => 65,
        V::B => 66,
        V::C => 67,
        V::D => 68,
        V::E => 69,
        V::F => 70,
        V::G => 71,
        V::H => 72,
        V::I => 73,
        V::J => 74,
        V::K => 75,
        V::L => 76,
        V::M => 77,
        V::N => 78,
        V::O => 79,
        V::P => 80,
        V::Q => 81,
        V::R => 82,
        V::S => 83,
        V::T => 84,
        V::U => 85,
        V::V => 86,
        V::W => 87,
        V::X => 88,
        V::Y => 89,
        V::Z => 90,

        _ => return None,
    };
    Some(Key::Code(code))
}

/// Opens a window and runs the composed devices until the window closes or a
/// refresh fails under the stop policy.
///
/// `update` runs once per redraw before the viewport refreshes; it is where
/// the caller reads keyboard state and moves the camera/world.
pub fn run<W, F>(
    config: AppConfig,
    mut keyboard: KeyboardDevice,
    mut viewport: ViewportDevice<RgbaCanvas, W>,
    mut update: F,
) -> Result<(), Box<dyn Error>>
where
    W: 'static,
    F: FnMut(&mut KeyboardDevice, &mut ViewportDevice<RgbaCanvas, W>) + 'static,
{
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(config.title)
        .with_inner_size(config.desired_size)
        .build(&event_loop)?;

    let window_size = window.inner_size();
    let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
    let frame_size = viewport.size();
    let mut pixels =
        PixelsBuilder::new(frame_size.width, frame_size.height, surface_texture).build()?;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match &event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    *control_flow = ControlFlow::Exit;
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(err) = pixels.resize_surface(new_size.width, new_size.height) {
                        log::error!("surface resize failed: {err}");
                    }
                }
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state,
                            virtual_keycode: Some(virtual_keycode),
                            ..
                        },
                    ..
                } => {
                    if let Some(key) = key_from_winit(*virtual_keycode) {
                        match state {
                            ElementState::Pressed => keyboard.key_down(key),
                            ElementState::Released => keyboard.key_up(key),
                        }
                    }
                }
                _ => {}
            },
            Event::RedrawRequested(_) => {
                update(&mut keyboard, &mut viewport);

                if viewport.autorefresh() {
                    if let Err(err) = viewport.refresh(0.0) {
                        log::error!("refresh failed, stopping: {err}");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                }

                pixels.frame_mut().copy_from_slice(viewport.ctx().frame());
                if let Err(err) = pixels.render() {
                    log::error!("present failed: {err}");
                    *control_flow = ControlFlow::Exit;
                }
            }
            Event::MainEventsCleared => {
                window.request_redraw();
            }
            _ => {}
        }
    });

    #[allow(unreachable_code)]
    Ok(())
}
