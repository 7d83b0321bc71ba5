//! The sleepy call graph: a task that waits on a chain of nested tasks, each
//! printing numbered steps between 100ms naps, and finally awaits a fresh
//! copy of itself.

use std::rc::Rc;
use std::string::String;

use crate::executor::LoopHandle;
use crate::task::Task;
use crate::time::Duration;

pub const DELAY: Duration = Duration::from_millis(100);

/// Where the demo writes its lines.
pub type Output = Rc<dyn Fn(&str)>;

/// Root of the demo. `remaining` bounds how many more times it may await itself.
pub fn sleepy_main(event_loop: &LoopHandle, out: Output, remaining: u32) -> Task<()> {
    let lp = event_loop.clone();
    event_loop.spawn(async move {
        if remaining == 0 {
            out("Goodbye!");
            return;
        }
        out("1");
        lp.sleep(DELAY).await;
        second(&lp, out.clone()).await;
        out("8");
        lp.sleep(DELAY).await;
        out("9");
        sleepy_main(&lp, out.clone(), remaining - 1).await;
        out("I finished awaiting myself.");
    })
}

fn second(event_loop: &LoopHandle, out: Output) -> Task<()> {
    let lp = event_loop.clone();
    event_loop.spawn(async move {
        out("  2");
        lp.sleep(DELAY).await;
        out("  3");
        lp.sleep(DELAY).await;
        third(&lp, out.clone()).await;
        out("  7");
        lp.sleep(DELAY).await;
    })
}

fn third(event_loop: &LoopHandle, out: Output) -> Task<()> {
    let lp = event_loop.clone();
    event_loop.spawn(async move {
        out("    4");
        lp.sleep(DELAY).await;
        out("    5");
        lp.sleep(DELAY).await;
        out("    6");
        lp.sleep(DELAY).await;
        let answer = fourth(&lp, out.clone()).await;
        out(&format!("fourth returned: {answer}"));
    })
}

fn fourth(event_loop: &LoopHandle, out: Output) -> Task<String> {
    let lp = event_loop.clone();
    event_loop.spawn(async move {
        out("        waahhh!");
        lp.sleep(DELAY).await;
        out("        ooooo!");
        String::from("fish sticks")
    })
}
