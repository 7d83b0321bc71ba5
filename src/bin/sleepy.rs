use std::rc::Rc;

use log::LevelFilter;

use sleepy_runtime::EventLoop;
use sleepy_runtime::demo::sleepy_main;

fn main() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .init();

    let event_loop = EventLoop::new();
    let main_task = sleepy_main(&event_loop, Rc::new(|line: &str| println!("{line}")), 1);

    event_loop.run();
    drop(main_task);

    println!("====== done ======");
}
