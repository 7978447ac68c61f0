//! Flattening of a forecast payload into storage points.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::{
    config::{FieldSet, SchemaConfig},
    model::{FieldValue, ForecastResponse, ForecastSample, Location, Measurement, Point},
};

pub const TAG_ICON: &str = "icon";
pub const TAG_LOCATION: &str = "location";

pub const FIELD_LATITUDE: &str = "latitude";
pub const FIELD_LONGITUDE: &str = "longitude";
pub const FIELD_SUMMARY: &str = "summary";
pub const FIELD_TEMPERATURE: &str = "temperature";
pub const FIELD_DEW_POINT: &str = "dewPoint";
pub const FIELD_HUMIDITY: &str = "humidity";
pub const FIELD_PRESSURE: &str = "pressure";
pub const FIELD_WIND_SPEED: &str = "windSpeed";
pub const FIELD_WIND_BEARING: &str = "windBearing";
pub const FIELD_CLOUD_COVER: &str = "cloudCover";

const NANOS_PER_SECOND: i64 = 1_000_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Sample time {0} is outside the representable nanosecond range")]
    TimestampOutOfRange(i64),
}

/// Convert epoch seconds to epoch nanoseconds without going through floats.
pub fn epoch_nanos(seconds: i64) -> Option<i64> {
    seconds.checked_mul(NANOS_PER_SECOND)
}

/// Turns one location's forecast into points.
///
/// Output is one `hourly` point per hourly sample, in provider order, followed by
/// a single `currently` point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointBuilder {
    schema: SchemaConfig,
}

impl PointBuilder {
    pub fn new(schema: SchemaConfig) -> Self {
        Self { schema }
    }

    pub fn build(
        &self,
        location: &Location,
        response: &ForecastResponse,
    ) -> Result<Vec<Point>, BuildError> {
        let mut points = Vec::with_capacity(response.hourly.len() + 1);

        for sample in &response.hourly {
            points.push(self.point(Measurement::Hourly, location, sample)?);
        }
        points.push(self.point(Measurement::Currently, location, &response.currently)?);

        Ok(points)
    }

    fn point(
        &self,
        measurement: Measurement,
        location: &Location,
        sample: &ForecastSample,
    ) -> Result<Point, BuildError> {
        let timestamp =
            epoch_nanos(sample.time).ok_or(BuildError::TimestampOutOfRange(sample.time))?;

        let tags = BTreeMap::from([
            (TAG_ICON.to_string(), sample.icon.clone()),
            (TAG_LOCATION.to_string(), location.name.clone()),
        ]);

        Ok(Point {
            measurement,
            tags,
            fields: fields(location, sample, self.schema.fields_for(measurement)),
            timestamp,
        })
    }
}

fn fields(
    location: &Location,
    sample: &ForecastSample,
    field_set: FieldSet,
) -> BTreeMap<String, FieldValue> {
    let mut fields: BTreeMap<String, FieldValue> = [
        (FIELD_LATITUDE, FieldValue::from(location.latitude)),
        (FIELD_LONGITUDE, location.longitude.into()),
        (FIELD_SUMMARY, sample.summary.clone().into()),
        (FIELD_TEMPERATURE, sample.temperature.into()),
        (FIELD_DEW_POINT, sample.dew_point.into()),
        (FIELD_HUMIDITY, sample.humidity.into()),
        (FIELD_PRESSURE, sample.pressure.into()),
        (FIELD_WIND_SPEED, sample.wind_speed.into()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    if let Some(wind_bearing) = sample.wind_bearing {
        fields.insert(FIELD_WIND_BEARING.to_string(), wind_bearing.into());
    }
    if let Some(cloud_cover) = sample.cloud_cover.filter(|_| field_set.cloud_cover) {
        fields.insert(FIELD_CLOUD_COVER.to_string(), cloud_cover.into());
    }

    fields
}
