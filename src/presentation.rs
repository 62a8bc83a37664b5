//! Delivery of pipeline events to the user-facing layer

use std::io::{self, Write};

use chrono::Local;
use tracing::{debug, warn};

use crate::models::{CurrentConditions, ForecastSeries};
use crate::orchestrator::FetchResult;
use crate::scheduler::{GenerationCounter, PipelineEvent};

/// Receives status, errors and weather data for display
pub trait Presenter {
    fn on_status(&mut self, text: &str);

    fn on_error(&mut self, message: &str);

    /// Either part may be missing after a partial failure
    fn on_weather_update(
        &mut self,
        current: Option<&CurrentConditions>,
        forecast: Option<&ForecastSeries>,
    );
}

/// Forwards pipeline events to a [`Presenter`], dropping stale ones.
///
/// An event is stale when a newer generation has started since, or when a
/// result for the same or a newer generation was already delivered.
pub struct ResultDispatcher {
    generations: GenerationCounter,
    last_completed: u64,
}

impl ResultDispatcher {
    #[must_use]
    pub fn new(generations: GenerationCounter) -> Self {
        Self {
            generations,
            last_completed: 0,
        }
    }

    /// Apply one event; returns false if it was discarded
    pub fn dispatch(&mut self, event: PipelineEvent, presenter: &mut dyn Presenter) -> bool {
        let generation = event.generation();
        let latest = self.generations.latest();
        if generation < latest || generation <= self.last_completed {
            debug!(
                "Discarding event of generation {} (latest {}, delivered {})",
                generation, latest, self.last_completed
            );
            return false;
        }

        match event {
            PipelineEvent::Status { state, .. } => presenter.on_status(state.status_text()),
            PipelineEvent::Completed { outcome, .. } => {
                self.last_completed = generation;
                match outcome.result {
                    FetchResult::Success(current, forecast) => {
                        presenter.on_weather_update(Some(&current), Some(&forecast));
                        presenter.on_status(&format!(
                            "Updated at {}",
                            Local::now().format("%H:%M")
                        ));
                    }
                    FetchResult::PartialFailure {
                        current,
                        forecast,
                        error,
                    } => {
                        warn!("Partial weather data: {}", error);
                        presenter.on_weather_update(current.as_ref(), forecast.as_ref());
                        presenter.on_status(&format!("Partial data: {}", error.user_message()));
                    }
                    FetchResult::Failure(error) => presenter.on_error(&error.user_message()),
                }
            }
        }
        true
    }
}

/// Plain-text presenter for a terminal
pub struct ConsolePresenter<W: Write> {
    out: W,
}

impl ConsolePresenter<io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(
        &mut self,
        current: Option<&CurrentConditions>,
        forecast: Option<&ForecastSeries>,
    ) -> io::Result<()> {
        writeln!(self.out)?;
        match current {
            Some(current) => {
                writeln!(self.out, "📍 {}", current.city_name)?;
                writeln!(self.out, "   {}", current.format_description())?;
                writeln!(
                    self.out,
                    "   🌡️ {}   💧 {}   💨 {}",
                    current.format_temperature(),
                    current.format_humidity(),
                    current.format_wind()
                )?;
            }
            None => writeln!(self.out, "   Current conditions unavailable")?,
        }

        match forecast {
            Some(series) if !series.is_empty() => {
                writeln!(self.out, "   Forecast:")?;
                for slot in &series.slots {
                    writeln!(
                        self.out,
                        "     {}  {:>7}  {}",
                        slot.label,
                        slot.format_temperature(),
                        slot.description
                    )?;
                }
            }
            Some(_) => writeln!(self.out, "   No forecast slots available")?,
            None => writeln!(self.out, "   Forecast unavailable")?,
        }
        self.out.flush()
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn on_status(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "[{text}]") {
            warn!("Failed to write status: {}", e);
        }
    }

    fn on_error(&mut self, message: &str) {
        if let Err(e) = writeln!(self.out, "Error: {message}") {
            warn!("Failed to write error: {}", e);
        }
    }

    fn on_weather_update(
        &mut self,
        current: Option<&CurrentConditions>,
        forecast: Option<&ForecastSeries>,
    ) {
        if let Err(e) = self.render(current, forecast) {
            warn!("Failed to write weather: {}", e);
        }
    }
}
