//! seisview - interactive 3D viewer for seismic survey data.
//!
//! Loads a JSON dataset of detectors, events and mine geometry and orbits
//! the camera around the first terrain object.

use seisview::app::{self, AppOptions};

fn main() {
    let options = match AppOptions::from_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!("{}", app::USAGE);
            std::process::exit(2);
        }
    };

    if let Err(err) = app::run(options) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
