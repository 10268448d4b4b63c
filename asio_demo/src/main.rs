//! Manual smoke-test binary: wires the registry, the Control surface, and a
//! counting sink together against the default input device. Not part of
//! the product surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use asio_engine::CountingSink;
use asio_plugin::{Control, Settings};

fn main() {
    env_logger::init();

    let control = match Control::new() {
        Ok(control) => control,
        Err(err) => {
            log::error!("failed to start the control surface: {err}");
            return;
        }
    };

    let device_id = control.with_registry(|registry| registry.devices().first().map(|d| d.name.clone()));
    let Some(device_id) = device_id else {
        log::error!("no input devices discovered");
        return;
    };
    log::info!("capturing from {device_id}");

    let mut settings = Settings::defaults();
    settings.set_device_id(device_id);

    let task_id = match control.attach_source(&settings, CountingSink::default()) {
        Ok(task_id) => task_id,
        Err(err) => {
            log::error!("failed to attach source: {err}");
            return;
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    log::info!("capturing; press Ctrl-C to stop");
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }

    if let Err(err) = control.detach_source(task_id) {
        log::error!("failed to detach source cleanly: {err}");
    }
}
