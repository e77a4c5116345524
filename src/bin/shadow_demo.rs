use bizsdk::app::App;
use bizsdk::log::{init_log, level_for};
use bizsdk::settings::Settings;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::WindowId,
};

struct ShadowDemo {
    settings: Settings,
    app: Option<App>,
}

impl ApplicationHandler for ShadowDemo {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }
        match App::new(event_loop, &self.settings) {
            Ok(app) => {
                app.window.request_redraw();
                self.app = Some(app);
            }
            Err(e) => {
                log::error!("startup failed: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(app) = self.app.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => app.resize(size),
            WindowEvent::RedrawRequested => {
                if !app.update() {
                    event_loop.exit();
                    return;
                }
                app.render();
                app.window.request_redraw();
            }
            other => app.handle_input(&other),
        }
    }
}

fn main() {
    let settings = match Settings::parse(std::env::args().skip(1)) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("usage: shadow_demo [width=N] [height=N] [fullscreen=0|1] [resizable=0|1] [vsync=0|1] [verbose=0|1] [showinfo=0|1] [mesh=FILE.obj] [cache=DIR] [logfile=FILE]");
            std::process::exit(2);
        }
    };

    if let Err(e) = init_log(level_for(settings.verbose), settings.logfile.as_deref()) {
        eprintln!("failed to initialise logging: {}", e);
    }
    log::info!("starting shadow demo {}x{}", settings.width, settings.height);

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("cannot create event loop: {}", e);
            std::process::exit(1);
        }
    };
    let mut demo = ShadowDemo { settings, app: None };
    if let Err(e) = event_loop.run_app(&mut demo) {
        log::error!("event loop terminated: {}", e);
    }
}
