use rocket::{Build, Rocket, launch};

#[launch]
fn rocket() -> Rocket<Build> {
    threadseek::rocket()
}
