use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::Context;
use clap::Parser;
use pixels::{Pixels, SurfaceTexture};
use rodio::{OutputStream, OutputStreamBuilder, Sink, Source, source::SquareWave};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, KeyCode, NamedKey},
    window::{Window, WindowId},
};

use vip8::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, InvalidOpcodePolicy, Machine, PixelGrid, Runner, RunnerConfig,
    u4,
};

const WINDOW_SCALE: u32 = 10;
const BEEP_FREQUENCY: f32 = 440.0;

/// How fast lit pixels fade after turning off, in units per second.
const PHOSPHOR_DECAY_RATE: f32 = 10.0;
/// Amber phosphor, full-brightness RGB.
const PHOSPHOR_COLOR: [f32; 3] = [1.0, 0.69, 0.0];

/// Physical keys feeding the hex keypad, indexed by keypad value.
const KEY_MAP: [KeyCode; 16] = [
    KeyCode::KeyX,   // 0x0
    KeyCode::Digit1, // 0x1
    KeyCode::Digit2, // 0x2
    KeyCode::Digit3, // 0x3
    KeyCode::KeyQ,   // 0x4
    KeyCode::KeyW,   // 0x5
    KeyCode::KeyE,   // 0x6
    KeyCode::KeyA,   // 0x7
    KeyCode::KeyS,   // 0x8
    KeyCode::KeyD,   // 0x9
    KeyCode::KeyZ,   // 0xA
    KeyCode::KeyC,   // 0xB
    KeyCode::Digit4, // 0xC
    KeyCode::KeyR,   // 0xD
    KeyCode::KeyF,   // 0xE
    KeyCode::KeyV,   // 0xF
];

struct App {
    surface: Option<Pixels<'static>>,
    window: Option<Arc<Window>>,
    /// Per-pixel brightness carried between frames for the phosphor fade.
    glow: PixelGrid<f32>,

    /// Keeps the audio device open for the lifetime of the app.
    _audio_stream: OutputStream,
    beep: Sink,

    runner: Runner,
    last_frame: Instant,

    /// Error captured inside the event loop, returned from main.
    exit_result: anyhow::Result<()>,
}

impl App {
    fn new(rom: &[u8], config: RunnerConfig) -> anyhow::Result<Self> {
        let mut _audio_stream = OutputStreamBuilder::open_default_stream()
            .context("Failed to open audio output stream")?;
        _audio_stream.log_on_drop(false);

        let beep = Sink::connect_new(_audio_stream.mixer());
        beep.pause();
        beep.append(SquareWave::new(BEEP_FREQUENCY).amplify(0.5));

        let mut machine = Machine::new();
        machine.load(rom).context("Failed to load ROM")?;
        let runner = Runner::with_config(machine, config);

        Ok(Self {
            surface: None,
            window: None,
            glow: [[0.0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],

            _audio_stream,
            beep,

            runner,
            last_frame: Instant::now(),
            exit_result: Ok(()),
        })
    }

    /// Folds the machine framebuffer into the glow buffer and writes the
    /// RGBA frame.
    fn blit(&mut self, dt: f32) -> anyhow::Result<()> {
        let surface = self
            .surface
            .as_mut()
            .context("Surface missing during redraw")?;
        let frame = surface.frame_mut();

        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                let glow = &mut self.glow[y][x];
                *glow = if self.runner.pixel(y, x) {
                    1.0
                } else {
                    (*glow - PHOSPHOR_DECAY_RATE * dt).max(0.0)
                };

                let offset = (y * DISPLAY_WIDTH + x) * 4;
                let rgba = [
                    (PHOSPHOR_COLOR[0] * *glow * 255.0) as u8,
                    (PHOSPHOR_COLOR[1] * *glow * 255.0) as u8,
                    (PHOSPHOR_COLOR[2] * *glow * 255.0) as u8,
                    0xFF,
                ];
                frame[offset..offset + 4].copy_from_slice(&rgba);
            }
        }

        Ok(())
    }

    fn try_resumed(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let size = LogicalSize::new(
            DISPLAY_WIDTH as u32 * WINDOW_SCALE,
            DISPLAY_HEIGHT as u32 * WINDOW_SCALE,
        );
        let min_size = LogicalSize::new(DISPLAY_WIDTH as u32, DISPLAY_HEIGHT as u32);

        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title("vip8")
                        .with_inner_size(size)
                        .with_min_inner_size(min_size),
                )
                .context("Failed to create window")?,
        );

        let window_size = window.inner_size();
        let surface_texture =
            SurfaceTexture::new(window_size.width, window_size.height, window.clone());
        let surface = Pixels::new(
            DISPLAY_WIDTH as u32,
            DISPLAY_HEIGHT as u32,
            surface_texture,
        )
        .context("Failed to create pixel surface")?;

        window.request_redraw();
        self.window = Some(window);
        self.surface = Some(surface);

        // Avoid a huge dt on the first frame
        self.last_frame = Instant::now();
        Ok(())
    }

    fn try_window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        event: WindowEvent,
    ) -> anyhow::Result<()> {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        ..
                    },
                ..
            } => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                self.surface
                    .as_mut()
                    .context("Surface missing during resize")?
                    .resize_surface(size.width, size.height)
                    .context("Failed to resize pixel surface")?;
            }

            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.last_frame).as_secs_f32();
                self.last_frame = now;

                self.runner.update(dt).context("Machine fault")?;

                if self.runner.sound_active() {
                    self.beep.play();
                } else {
                    self.beep.pause();
                }

                self.blit(dt)?;

                self.surface
                    .as_ref()
                    .context("Surface missing during redraw")?
                    .render()
                    .context("Render error")?;

                self.window
                    .as_ref()
                    .context("Window missing during redraw")?
                    .request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(key) = KEY_MAP.iter().position(|&k| k == event.physical_key) {
                    let pressed = event.state == ElementState::Pressed;
                    self.runner.set_key(u4::new(key as u8), pressed);
                }
            }

            _ => (),
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.try_resumed(event_loop) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Err(e) = self.try_window_event(event_loop, event) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }
}

/// CHIP-8 emulator.
///
/// Keys 1-4, Q-R, A-F and Z-V map to the hex keypad. Escape exits.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the ROM file
    rom_path: PathBuf,

    /// Instruction rate in Hz
    #[arg(long, default_value_t = 700.0)]
    cpu_hz: f32,

    /// Step over invalid opcodes instead of stopping
    #[arg(long)]
    skip_invalid: bool,
}

fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .env()
        .init()
        .context("Failed to initialize logging")?;

    let args = Args::parse();
    let config = RunnerConfig {
        cpu_hz: args.cpu_hz,
        invalid_opcode: if args.skip_invalid {
            InvalidOpcodePolicy::Skip
        } else {
            InvalidOpcodePolicy::Halt
        },
    };

    let rom = std::fs::read(&args.rom_path).context("Failed to read ROM file")?;

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(&rom, config).context("Failed to initialize application")?;
    event_loop
        .run_app(&mut app)
        .context("Event loop error")?;

    app.exit_result
}
