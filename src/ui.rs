use crate::action::Action;
use crate::models::SessionView;

pub fn render_index(view: &SessionView) -> String {
    let game = &view.current.game;
    let stats = game.ledger.stats();
    let totals = &view.current.totals;
    // User text goes in last and has its braces escaped, so it can never
    // complete a placeholder.
    INDEX_HTML
        .replace("{{DATE}}", &game.game_date.to_string())
        .replace("{{PTS}}", &totals.points.to_string())
        .replace("{{REB}}", &totals.rebounds.to_string())
        .replace("{{AST}}", &stats.ast.to_string())
        .replace("{{FG}}", &format!("{}/{} ({})", stats.fgm, stats.fga, totals.field_goal_pct))
        .replace("{{BUTTONS}}", &render_buttons())
        .replace("{{PHOTO}}", &render_photo(view.current.player.photo.as_deref()))
        .replace("{{OPPONENT}}", &escape_html(&game.opposition))
        .replace("{{PLAYER}}", &escape_html(&view.current.player.name))
}

fn render_photo(photo: Option<&str>) -> String {
    match photo {
        Some(src) => format!(r#"src="{}""#, escape_html(src)),
        None => "hidden".to_string(),
    }
}

fn render_buttons() -> String {
    Action::ALL
        .iter()
        .map(|action| {
            let variant = match action.shot() {
                Some(shot) if shot.made => "btn-made",
                Some(_) => "btn-miss",
                None => "btn-stat",
            };
            format!(
                r#"<form method="post" action="/actions/{token}"><button class="{variant}" data-action="{token}" type="submit">{label}</button></form>"#,
                token = action.token(),
                label = action.label(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n        ")
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('{', "&#123;")
        .replace('}', "&#125;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Basketball Stat Tracker</title>
  <style>
    :root {
      --bg: #111827;
      --card: #1f2937;
      --ink: #f3f4f6;
      --muted: #9ca3af;
      --accent: #22d3ee;
      --made: #16a34a;
      --miss: #dc2626;
      --stat: #4f46e5;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Inter", "Trebuchet MS", sans-serif;
      padding: 24px 16px 48px;
    }

    .app {
      width: min(1120px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 20px;
    }

    header {
      display: flex;
      flex-wrap: wrap;
      gap: 12px;
      align-items: center;
      justify-content: space-between;
      border-bottom: 1px solid #374151;
      padding-bottom: 16px;
    }

    h1 {
      margin: 0;
      font-size: clamp(1.6rem, 3vw, 2.2rem);
    }

    h1 span {
      color: var(--accent);
    }

    .avatar {
      width: 40px;
      height: 40px;
      border-radius: 50%;
      object-fit: cover;
      border: 2px solid var(--accent);
    }

    .meta {
      display: flex;
      flex-wrap: wrap;
      gap: 8px;
      align-items: center;
    }

    input, select {
      background: var(--card);
      color: var(--ink);
      border: 1px solid #374151;
      border-radius: 8px;
      padding: 6px 10px;
      font-size: 1rem;
    }

    input.score {
      width: 5em;
    }

    .layout {
      display: grid;
      grid-template-columns: 2fr 1fr;
      gap: 20px;
    }

    .card {
      background: var(--card);
      border-radius: 14px;
      padding: 16px;
      display: grid;
      gap: 12px;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(120px, 1fr));
      gap: 12px;
    }

    .stat .label {
      display: block;
      font-size: 0.75rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: var(--muted);
    }

    .stat .value {
      font-size: 1.6rem;
      font-weight: 700;
    }

    .controls {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(150px, 1fr));
      gap: 10px;
    }

    .controls form {
      margin: 0;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 10px;
      padding: 12px 14px;
      font-size: 0.95rem;
      font-weight: 600;
      color: white;
      cursor: pointer;
      width: 100%;
      background: #4b5563;
    }

    button:disabled {
      background: #374151;
      color: #6b7280;
      cursor: not-allowed;
    }

    .btn-made { background: var(--made); }
    .btn-miss { background: var(--miss); }
    .btn-stat { background: var(--stat); }
    .btn-accent { background: #0891b2; }

    .toolbar {
      display: flex;
      flex-wrap: wrap;
      gap: 8px;
    }

    .toolbar button {
      width: auto;
    }

    ul.log, ul.history {
      list-style: none;
      margin: 0;
      padding: 0;
      display: grid;
      gap: 8px;
      max-height: 60vh;
      overflow-y: auto;
    }

    ul.log li, ul.history li {
      background: #374151;
      border-radius: 8px;
      padding: 8px 10px;
      display: flex;
      justify-content: space-between;
      align-items: center;
      gap: 8px;
    }

    li button {
      width: auto;
      padding: 4px 10px;
      font-size: 0.8rem;
    }

    .time {
      color: var(--muted);
      font-size: 0.8rem;
    }

    .summary {
      white-space: pre-wrap;
      color: #d1d5db;
      min-height: 3em;
    }

    .banner {
      background: #713f12;
      color: #fde68a;
      border-radius: 8px;
      padding: 10px 12px;
      display: none;
      justify-content: space-between;
    }

    .banner.visible {
      display: flex;
    }

    .status {
      min-height: 1.2em;
      color: var(--muted);
    }

    .status[data-type="error"] {
      color: #f87171;
    }

    @media (max-width: 860px) {
      .layout {
        grid-template-columns: 1fr;
      }
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <div>
        <h1>Basketball Stat Tracker <span>AI</span></h1>
        <div class="meta">
          <img id="player-photo" class="avatar" alt="Player photo" {{PHOTO}} />
          <select id="player-select" aria-label="Player"><option>{{PLAYER}}</option></select>
          <button id="add-player" class="btn-stat" type="button" style="width:auto">+ Player</button>
          <button id="edit-player" type="button" style="width:auto">Rename</button>
          <label class="btn-stat" style="border-radius:10px;padding:12px 14px;cursor:pointer">
            Photo <input id="photo-input" type="file" accept="image/*" hidden />
          </label>
          <button id="remove-photo" type="button" style="width:auto">Remove Photo</button>
          <span>vs</span>
          <input id="opponent" type="text" value="{{OPPONENT}}" aria-label="Opponent" />
          <input id="game-date" type="date" value="{{DATE}}" aria-label="Game date" />
          <input id="our-score" class="score" type="number" min="0" placeholder="Us" aria-label="Team score" />
          <input id="their-score" class="score" type="number" min="0" placeholder="Them" aria-label="Opponent score" />
        </div>
      </div>
      <div class="toolbar">
        <button id="new-game" class="btn-made" type="button">Start New Game</button>
        <button id="export" class="btn-accent" type="button">Export CSV</button>
        <button id="reset" class="btn-miss" type="button">Reset Game</button>
      </div>
    </header>

    <div id="banner" class="banner">
      <span>Viewing a past game. Stats are read-only.</span>
      <button id="back" type="button" style="width:auto">Return to Current Game</button>
    </div>

    <div class="layout">
      <div style="display:grid;gap:20px">
        <section class="card panel">
          <div class="stat"><span class="label">Points</span><span id="pts" class="value">{{PTS}}</span></div>
          <div class="stat"><span class="label">Rebounds</span><span id="reb" class="value">{{REB}}</span></div>
          <div class="stat"><span class="label">Assists</span><span id="ast" class="value">{{AST}}</span></div>
          <div class="stat"><span class="label">Steals</span><span id="stl" class="value">0</span></div>
          <div class="stat"><span class="label">Blocks</span><span id="blk" class="value">0</span></div>
          <div class="stat"><span class="label">Turnovers</span><span id="tov" class="value">0</span></div>
          <div class="stat"><span class="label">Fouls</span><span id="pf" class="value">0</span></div>
          <div class="stat"><span class="label">FG</span><span id="fg" class="value">{{FG}}</span></div>
          <div class="stat"><span class="label">3PT</span><span id="tp" class="value">-</span></div>
          <div class="stat"><span class="label">FT</span><span id="ft" class="value">-</span></div>
        </section>

        <section class="card controls" id="controls">
        {{BUTTONS}}
        </section>

        <section class="card">
          <h2 style="margin:0">AI Game Summary</h2>
          <button id="summarize" class="btn-accent" type="button">Generate Performance Summary</button>
          <p id="summary" class="summary"></p>
        </section>
      </div>

      <aside class="card">
        <div class="toolbar">
          <button id="tab-log" class="btn-stat" type="button">Game Log</button>
          <button id="tab-history" type="button">Game History</button>
        </div>
        <ul id="log" class="log"></ul>
        <ul id="history" class="history" hidden></ul>
      </aside>
    </div>

    <div class="status" id="status"></div>
  </main>
  <script>
    const $ = (id) => document.getElementById(id);
    const statusEl = $('status');
    let state = null;
    let viewing = null;
    let generating = false;

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const api = async (method, url, body) => {
      const res = await fetch(url, {
        method,
        headers: body ? { 'content-type': 'application/json' } : {},
        body: body ? JSON.stringify(body) : undefined
      });
      if (!res.ok) {
        const msg = await res.text();
        throw new Error(msg || 'Request failed');
      }
      return res.json();
    };

    const shown = () => viewing || state.current;

    const render = () => {
      const view = shown();
      const game = view.game;
      const s = game.stats;
      const v = (key) => s[key] || 0;

      const select = $('player-select');
      select.innerHTML = '';
      state.players.forEach((p) => {
        const opt = document.createElement('option');
        opt.value = p.id;
        opt.textContent = p.name;
        opt.selected = p.id === state.active_player_id;
        select.appendChild(opt);
      });

      const photo = state.current.player.photo;
      $('player-photo').hidden = !photo;
      if (photo) $('player-photo').src = photo;
      $('remove-photo').disabled = !photo;

      $('opponent').value = game.opposition;
      $('game-date').value = game.gameDate;
      $('our-score').value = game.playerTeamScore ?? '';
      $('their-score').value = game.oppositionTeamScore ?? '';
      ['opponent', 'game-date', 'our-score', 'their-score'].forEach((id) => { $(id).disabled = view.read_only; });

      $('pts').textContent = view.totals.points;
      $('reb').textContent = view.totals.rebounds;
      $('ast').textContent = v('AST');
      $('stl').textContent = v('STL');
      $('blk').textContent = v('BLK');
      $('tov').textContent = v('TOV');
      $('pf').textContent = v('PF');
      $('fg').textContent = `${v('FGM')}/${v('FGA')} (${view.totals.field_goal_pct})`;
      $('tp').textContent = `${v('TPM')}/${v('TPA')} (${view.totals.three_point_pct})`;
      $('ft').textContent = `${v('FTM')}/${v('FTA')} (${view.totals.free_throw_pct})`;

      const empty = game.log.length === 0;
      document.querySelectorAll('#controls button').forEach((b) => { b.disabled = view.read_only; });
      $('export').disabled = empty;
      $('reset').disabled = view.read_only || empty;
      $('summarize').disabled = generating || empty;
      $('summarize').textContent = generating ? 'Generating...' : 'Generate Performance Summary';
      $('summary').textContent = game.summary;
      $('banner').classList.toggle('visible', view.read_only);

      const log = $('log');
      log.innerHTML = '';
      if (empty) {
        log.innerHTML = '<li><span class="time">No actions logged yet.</span></li>';
      }
      game.log.forEach((entry) => {
        const li = document.createElement('li');
        const text = document.createElement('span');
        text.innerHTML = `<span class="time"></span> `;
        text.firstChild.textContent = entry.timestamp;
        text.appendChild(document.createTextNode(entry.actionText));
        li.appendChild(text);
        if (!view.read_only) {
          const undo = document.createElement('button');
          undo.textContent = 'Undo';
          undo.addEventListener('click', () => run(() => api('POST', `/api/log/${entry.id}/undo`)));
          li.appendChild(undo);
        }
        log.appendChild(li);
      });

      const history = $('history');
      history.innerHTML = '';
      if (state.history.length === 0) {
        history.innerHTML = '<li><span class="time">No past games saved.</span></li>';
      }
      state.history.forEach((item) => {
        const li = document.createElement('li');
        const label = document.createElement('span');
        const score = item.result ? ` ${item.result[0].toUpperCase()} ${item.player_team_score}-${item.opposition_team_score}` : '';
        label.textContent = `vs ${item.opposition}${score} · ${item.game_date} · ${item.points} PTS`;
        const load = document.createElement('button');
        load.textContent = 'Load';
        load.addEventListener('click', () => {
          api('GET', `/api/games/${item.id}`)
            .then((view) => { viewing = view; render(); })
            .catch((err) => setStatus(err.message, 'error'));
        });
        const del = document.createElement('button');
        del.textContent = 'Delete';
        del.className = 'btn-miss';
        del.addEventListener('click', () => {
          if (confirm(`Delete the game vs ${item.opposition} on ${item.game_date}? This cannot be undone.`)) {
            if (viewing && viewing.game.id === item.id) viewing = null;
            run(() => api('DELETE', `/api/games/${item.id}`));
          }
        });
        li.append(label, load, del);
        history.appendChild(li);
      });
    };

    const run = async (call) => {
      try {
        state = await call();
        if (viewing) {
          viewing = await api('GET', `/api/games/${viewing.game.id}`).catch(() => null);
        }
        render();
        setStatus('', '');
      } catch (err) {
        setStatus(err.message, 'error');
      }
    };

    document.querySelectorAll('#controls form').forEach((form) => {
      form.addEventListener('submit', (event) => {
        event.preventDefault();
        const action = form.querySelector('button').dataset.action;
        run(() => api('POST', '/api/actions', { action }));
      });
    });

    const updateGame = (patch) => run(() => api('PATCH', '/api/game', patch));
    const scoreValue = (id) => ($(id).value === '' ? null : Number($(id).value));
    $('opponent').addEventListener('change', () => updateGame({ opposition: $('opponent').value }));
    $('game-date').addEventListener('change', () => updateGame({ game_date: $('game-date').value }));
    $('our-score').addEventListener('change', () => updateGame({ player_team_score: scoreValue('our-score') }));
    $('their-score').addEventListener('change', () => updateGame({ opposition_team_score: scoreValue('their-score') }));

    $('player-select').addEventListener('change', (event) => {
      viewing = null;
      run(() => api('POST', `/api/players/${event.target.value}/select`));
    });
    $('add-player').addEventListener('click', () => {
      const name = prompt('Player name');
      if (name !== null) run(() => api('POST', '/api/players', { name }));
    });
    $('edit-player').addEventListener('click', () => {
      const player = state.current.player;
      const name = prompt('Player name', player.name);
      if (name !== null) run(() => api('PUT', `/api/players/${player.id}`, { name, photo: player.photo }));
    });

    const savePhoto = (photo) => {
      const player = state.current.player;
      run(() => api('PUT', `/api/players/${player.id}`, { name: player.name, photo }));
    };
    $('photo-input').addEventListener('change', (event) => {
      const file = event.target.files[0];
      if (!file) return;
      const reader = new FileReader();
      reader.onload = () => savePhoto(reader.result);
      reader.onerror = () => setStatus('Could not read that image.', 'error');
      reader.readAsDataURL(file);
      event.target.value = '';
    });
    $('remove-photo').addEventListener('click', () => savePhoto(null));

    $('new-game').addEventListener('click', () => {
      viewing = null;
      run(() => api('POST', '/api/games'));
    });
    $('reset').addEventListener('click', () => {
      if (confirm('Reset all stats and the log for the current game? This cannot be undone.')) {
        run(() => api('POST', '/api/game/reset'));
      }
    });
    $('back').addEventListener('click', () => { viewing = null; render(); });
    $('export').addEventListener('click', () => {
      if (shown().game.log.length === 0) {
        alert('No stats to export for this game.');
        return;
      }
      window.location.href = `/api/games/${shown().game.id}/export.csv`;
    });
    $('summarize').addEventListener('click', async () => {
      const gameId = shown().game.id;
      generating = true;
      render();
      try {
        await api('POST', `/api/games/${gameId}/summary`);
      } catch (err) {
        setStatus(err.message, 'error');
      }
      generating = false;
      await run(() => api('GET', '/api/state'));
    });

    $('tab-log').addEventListener('click', () => {
      $('log').hidden = false;
      $('history').hidden = true;
    });
    $('tab-history').addEventListener('click', () => {
      $('log').hidden = true;
      $('history').hidden = false;
    });

    run(() => api('GET', '/api/state'));
  </script>
</body>
</html>
"#;
