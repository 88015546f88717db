//! The subset of Navitia responses the CLI reads. Unknown fields are ignored.

use crate::model::Coordinates;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeparturesResponse {
    #[serde(default)]
    pub departures: Vec<Departure>,
    #[serde(default)]
    pub context: Option<ResponseContext>,
}

/// Server-side clock, in the same local time zone as the departure times.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseContext {
    #[serde(default)]
    pub current_datetime: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Departure {
    pub display_informations: DisplayInformations,
    pub stop_date_time: StopDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DisplayInformations {
    pub direction: String,
    pub code: String,
    pub commercial_mode: String,
    pub network: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopDateTime {
    /// Local time as `YYYYMMDDTHHMMSS`.
    pub departure_date_time: String,
    #[serde(default)]
    pub data_freshness: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacesNearbyResponse {
    #[serde(default)]
    pub places_nearby: Vec<Place>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacesResponse {
    #[serde(default)]
    pub places: Vec<Place>,
}

/// A Navitia place: stop area, stop point or address, depending on `embedded_type`.
#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub embedded_type: String,
    #[serde(default)]
    pub distance: Option<String>,
    #[serde(default)]
    pub stop_area: Option<StopArea>,
    #[serde(default)]
    pub stop_point: Option<StopPoint>,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopPoint {
    pub id: String,
    #[serde(default)]
    pub stop_area: Option<StopArea>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StopArea {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    pub name: String,
    pub coord: Coord,
}

/// Navitia encodes coordinates as decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct Coord {
    pub lon: String,
    pub lat: String,
}

impl Coord {
    pub fn coordinates(&self) -> Option<Coordinates> {
        let c = Coordinates::new(self.lat.parse().ok()?, self.lon.parse().ok()?);
        c.is_valid().then_some(c)
    }
}

impl Place {
    /// The stop area this place belongs to, if it is a stop area or a stop point.
    pub fn parent_stop_area(&self) -> Option<&StopArea> {
        self.stop_area
            .as_ref()
            .or_else(|| self.stop_point.as_ref()?.stop_area.as_ref())
    }
}

/// Stop areas around a position, nearest first, each listed once.
pub fn nearby_stop_areas(places: &[Place]) -> Vec<StopArea> {
    let mut out: Vec<StopArea> = Vec::new();
    for area in places.iter().filter_map(Place::parent_stop_area) {
        if !out.iter().any(|seen| seen.id == area.id) {
            out.push(area.clone());
        }
    }
    out
}

/// What a free-text place search resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceTarget {
    StopArea(StopArea),
    Position { name: String, coords: Coordinates },
}

/// Pick the first stop area among search results, else the first address.
pub fn resolve_place(places: &[Place]) -> Option<PlaceTarget> {
    places
        .iter()
        .find(|p| p.embedded_type == "stop_area")
        .and_then(|p| p.stop_area.clone())
        .map(PlaceTarget::StopArea)
        .or_else(|| {
            places.iter().find_map(|p| {
                let address = p.address.as_ref()?;
                Some(PlaceTarget::Position {
                    name: address.name.clone(),
                    coords: address.coord.coordinates()?,
                })
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places(json: &str) -> Vec<Place> {
        serde_json::from_str::<PlacesNearbyResponse>(json)
            .unwrap()
            .places_nearby
    }

    #[test]
    fn nearby_stop_points_collapse_to_stop_areas() {
        let places = places(
            r#"{"places_nearby":[
                {"id":"sp:1","name":"Châtelet (M1)","embedded_type":"stop_point","distance":"40",
                 "stop_point":{"id":"sp:1","stop_area":{"id":"sa:chatelet","name":"Châtelet"}}},
                {"id":"sp:2","name":"Châtelet (M4)","embedded_type":"stop_point","distance":"80",
                 "stop_point":{"id":"sp:2","stop_area":{"id":"sa:chatelet","name":"Châtelet"}}},
                {"id":"sp:3","name":"Les Halles","embedded_type":"stop_point","distance":"210",
                 "stop_point":{"id":"sp:3","stop_area":{"id":"sa:halles","name":"Les Halles"}}},
                {"id":"poi:1","name":"Fontaine","embedded_type":"poi"}
            ]}"#,
        );
        let areas = nearby_stop_areas(&places);
        let ids: Vec<&str> = areas.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["sa:chatelet", "sa:halles"]);
    }

    #[test]
    fn search_prefers_stop_areas_over_addresses() {
        let results: PlacesResponse = serde_json::from_str(
            r#"{"places":[
                {"id":"2.3;48.8","name":"1 Rue de Rivoli","embedded_type":"address",
                 "address":{"name":"1 Rue de Rivoli","coord":{"lon":"2.3470","lat":"48.8590"}}},
                {"id":"sa:chatelet","name":"Châtelet (Paris)","embedded_type":"stop_area",
                 "stop_area":{"id":"sa:chatelet","name":"Châtelet"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            resolve_place(&results.places),
            Some(PlaceTarget::StopArea(StopArea {
                id: "sa:chatelet".into(),
                name: "Châtelet".into()
            }))
        );

        let only_address = &results.places[..1];
        match resolve_place(only_address) {
            Some(PlaceTarget::Position { name, coords }) => {
                assert_eq!(name, "1 Rue de Rivoli");
                assert_eq!(coords, Coordinates::new(48.859, 2.347));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(resolve_place(&[]), None);
    }
}
