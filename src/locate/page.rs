//! Static capture page served on `/locate`.
//!
//! The page asks the browser for the device position and posts it to
//! `/callback`. When geolocation is unavailable or denied it falls back to a
//! place search (OpenStreetMap Nominatim) or manual coordinate entry; every path
//! ends in the same `POST /callback` with `{"lat": .., "lon": ..}`.

pub const CALLBACK_PATH: &str = "/callback";
pub const PAGE_PATH: &str = "/locate";

pub(crate) const CAPTURE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>metro · share location</title>
<style>
  :root { color-scheme: dark; }
  body { margin: 0; min-height: 100vh; display: grid; place-items: center;
         font: 15px/1.4 system-ui, -apple-system, sans-serif;
         background: #15171f; color: #dde1ea; }
  main { width: min(420px, 92vw); text-align: center; }
  .spinner { width: 22px; height: 22px; margin: 0 auto 12px;
             border: 3px solid #3a3f4d; border-top-color: #2fa3ff;
             border-radius: 50%; animation: spin .8s linear infinite; }
  @keyframes spin { to { transform: rotate(360deg); } }
  .ok   { color: #3ddc84; }
  .fail { color: #ff5c5c; }
  .muted { color: #8a90a0; font-size: .85em; }
  input { box-sizing: border-box; width: 100%; margin: 4px 0; padding: 8px 10px;
          border: 1px solid #3a3f4d; border-radius: 4px;
          background: #222633; color: inherit; }
  button { margin-top: 8px; padding: 8px 18px; border: 0; border-radius: 4px;
           background: #2fa3ff; color: #15171f; font-weight: 600; cursor: pointer; }
  button:hover { background: #1c8fe8; }
  details { margin-top: 16px; }
  summary { cursor: pointer; }
</style>
</head>
<body>
<main id="panel">
  <div class="spinner"></div>
  <p>Sharing your location with the <strong>metro</strong> CLI&hellip;</p>
</main>
<script>
var panel = document.getElementById('panel');

function post(lat, lon) {
  fetch('/callback', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ lat: lat, lon: lon })
  }).then(function (res) {
    if (!res.ok) { throw new Error('status ' + res.status); }
    panel.innerHTML = '<p class="ok">Location sent. You can close this tab.</p>';
    setTimeout(function () { window.close(); }, 1500);
  }).catch(function (err) {
    panel.innerHTML = '<p class="fail">Could not reach the CLI (' + err.message + ').</p>';
  });
}

function fallback(reason) {
  panel.innerHTML =
    '<p class="fail"></p>' +
    '<p>Search for a station or address:</p>' +
    '<input id="query" type="text" placeholder="e.g. Place d\'Italie" autofocus>' +
    '<button id="search">Search</button>' +
    '<p id="status" class="muted"></p>' +
    '<details><summary class="muted">Or enter coordinates</summary>' +
    '<input id="lat" type="number" step="any" placeholder="Latitude (e.g. 48.8566)">' +
    '<input id="lon" type="number" step="any" placeholder="Longitude (e.g. 2.3522)">' +
    '<button id="manual">Share location</button>' +
    '</details>';
  panel.querySelector('.fail').textContent = reason;
  document.getElementById('search').onclick = search;
  document.getElementById('manual').onclick = manual;
  document.getElementById('query').addEventListener('keydown', function (e) {
    if (e.key === 'Enter') { search(); }
  });
}

function search() {
  var q = document.getElementById('query').value.trim();
  var status = document.getElementById('status');
  if (!q) { return; }
  status.className = 'muted';
  status.textContent = 'Searching…';
  fetch('https://nominatim.openstreetmap.org/search?format=json&limit=1&countrycodes=fr&q=' +
        encodeURIComponent(q))
    .then(function (r) { return r.json(); })
    .then(function (hits) {
      if (!hits.length) {
        status.className = 'fail';
        status.textContent = 'No match. Try another query.';
        return;
      }
      status.className = 'ok';
      status.textContent = 'Found: ' + hits[0].display_name.split(',').slice(0, 2).join(',');
      setTimeout(function () { post(parseFloat(hits[0].lat), parseFloat(hits[0].lon)); }, 500);
    })
    .catch(function () {
      status.className = 'fail';
      status.textContent = 'Search failed. Enter coordinates instead.';
    });
}

function manual() {
  var lat = parseFloat(document.getElementById('lat').value);
  var lon = parseFloat(document.getElementById('lon').value);
  if (isNaN(lat) || isNaN(lon)) { alert('Please enter valid coordinates'); return; }
  post(lat, lon);
}

if (!navigator.geolocation) {
  fallback('Geolocation is unavailable here (it needs HTTPS or localhost).');
} else {
  navigator.geolocation.getCurrentPosition(
    function (pos) { post(pos.coords.latitude, pos.coords.longitude); },
    function (err) { fallback('Could not get your location: ' + err.message); },
    { enableHighAccuracy: true, timeout: 15000, maximumAge: 0 }
  );
}
</script>
</body>
</html>
"#;
