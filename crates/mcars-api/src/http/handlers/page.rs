//! The storefront page hosting the floating chat widget.
//!
//! The page is a thin client: it forwards clicks and key presses as
//! commands over `/ws/widget` and applies the server's view patches. All
//! markup for bubbles is rendered and escaped server-side.

use axum::extract::State;
use axum::response::Html;

use mcars_core::render::{escape_html, render_quick_actions};
use mcars_types::config::WidgetConfig;

use crate::state::AppState;

const QUICK_ACTIONS_SLOT: &str = "{{QUICK_ACTIONS}}";
const STOREFRONT_SLOT: &str = "{{STOREFRONT_URL}}";

pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>MCARS PH</title>
<script src="https://cdn.tailwindcss.com"></script>
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css">
<style>
  #chat-window { opacity: 0; transform: translateY(16px) scale(0.98); pointer-events: none; transition: all 0.25s ease; }
  #chat-window.active { opacity: 1; transform: none; pointer-events: auto; }
  #quick-actions::-webkit-scrollbar { display: none; }
  .delay-75 { animation-delay: 75ms; }
  .delay-150 { animation-delay: 150ms; }
</style>
</head>
<body class="bg-slate-100 min-h-screen font-sans">
<main class="max-w-3xl mx-auto px-6 py-16 text-slate-700">
  <h1 class="text-3xl font-black text-slate-900">MCARS <span class="text-red-600">PH</span></h1>
  <p class="mt-2">Car parts, accessories, and automotive products shipped nationwide. Visit <a class="text-red-600 font-semibold" href="https://{{STOREFRONT_URL}}">{{STOREFRONT_URL}}</a>.</p>
</main>

<div id="chat-window" class="fixed bottom-24 right-6 w-[370px] max-w-[calc(100vw-3rem)] h-[560px] max-h-[calc(100vh-8rem)] bg-slate-50 rounded-3xl shadow-2xl border border-slate-200 flex flex-col overflow-hidden z-50">
  <header class="bg-red-600 text-white px-4 py-3 flex items-center justify-between">
    <div class="flex items-center gap-2">
      <div class="h-8 w-8 rounded-full bg-white/20 flex items-center justify-center"><i class="fa-solid fa-robot text-sm"></i></div>
      <div>
        <p class="text-sm font-bold leading-tight">MCARS PH Assistant</p>
        <p class="text-[10px] uppercase tracking-widest opacity-80">Online</p>
      </div>
    </div>
    <button id="reset-btn" type="button" title="Start over" class="h-8 w-8 rounded-full hover:bg-white/20"><i class="fa-solid fa-rotate-right text-xs"></i></button>
  </header>
  <div id="message-list" class="flex-1 overflow-y-auto px-3 py-4"></div>
  <div id="quick-actions-container" class="px-3">
    <div id="quick-actions" class="flex gap-2 overflow-x-auto pb-2">{{QUICK_ACTIONS}}</div>
  </div>
  <div class="p-3 border-t border-slate-200 bg-white flex gap-2">
    <input id="chat-input" type="text" autocomplete="off" placeholder="Ask about parts, delivery, returns..." class="flex-1 rounded-full border border-slate-200 px-4 py-2 text-[13px] focus:outline-none focus:border-red-400">
    <button id="send-btn" type="button" class="h-9 w-9 rounded-full bg-red-600 text-white disabled:opacity-50"><i class="fa-solid fa-paper-plane text-xs"></i></button>
  </div>
</div>

<button id="chat-toggle" type="button" class="fixed bottom-6 right-6 h-14 w-14 rounded-full bg-red-600 text-white shadow-xl z-50">
  <i id="toggle-icon-open" class="fa-solid fa-comment-dots text-xl"></i>
  <i id="toggle-icon-close" class="fa-solid fa-xmark text-xl hidden"></i>
  <span id="chat-badge" class="absolute -top-1 -right-1 h-4 w-4 rounded-full bg-amber-400 border-2 border-white"></span>
</button>

<script>
(() => {
  const messageList = document.getElementById('message-list');
  const chatInput = document.getElementById('chat-input');
  const sendBtn = document.getElementById('send-btn');
  const resetBtn = document.getElementById('reset-btn');
  const quickActions = document.getElementById('quick-actions');
  const chatToggle = document.getElementById('chat-toggle');
  const chatWindow = document.getElementById('chat-window');
  const iconOpen = document.getElementById('toggle-icon-open');
  const iconClose = document.getElementById('toggle-icon-close');
  const chatBadge = document.getElementById('chat-badge');
  const bubbles = new Map();

  const scheme = location.protocol === 'https:' ? 'wss' : 'ws';
  const socket = new WebSocket(`${scheme}://${location.host}/ws/widget`);
  const send = (cmd) => { if (socket.readyState === WebSocket.OPEN) socket.send(JSON.stringify(cmd)); };

  const apply = {
    append(p) {
      const row = document.createElement('div');
      row.innerHTML = p.html;
      const bubble = row.querySelector('.content-bubble');
      if (bubble) bubbles.set(p.id, bubble);
      messageList.appendChild(row);
    },
    replace(p) { const b = bubbles.get(p.id); if (b) b.innerHTML = p.html; },
    scroll() { messageList.scrollTop = messageList.scrollHeight; },
    clear() { messageList.innerHTML = ''; bubbles.clear(); },
    clear_input() { chatInput.value = ''; },
    send_enabled(p) { sendBtn.disabled = !p.enabled; },
    quick_actions(p) { quickActions.classList.toggle('hidden', !p.visible); },
    open(p) {
      chatWindow.classList.toggle('active', p.open);
      iconOpen.classList.toggle('hidden', p.open);
      iconClose.classList.toggle('hidden', !p.open);
      if (p.open) {
        chatBadge.classList.add('hidden');
        setTimeout(() => chatInput.focus(), 300);
      }
    },
    pong() {},
  };

  socket.addEventListener('message', (event) => {
    const patch = JSON.parse(event.data);
    const handler = apply[patch.type];
    if (handler) handler(patch);
  });

  chatToggle.addEventListener('click', () => send({ type: 'toggle' }));
  sendBtn.addEventListener('click', () => send({ type: 'send', text: chatInput.value }));
  chatInput.addEventListener('keydown', (e) => {
    if (e.key === 'Enter') send({ type: 'send', text: chatInput.value });
  });
  resetBtn.addEventListener('click', () => send({ type: 'reset' }));
  quickActions.addEventListener('click', (e) => {
    const button = e.target.closest('.quick-action');
    if (button) send({ type: 'quick_action', index: Number(button.dataset.index) });
  });
  setInterval(() => send({ type: 'ping' }), 30000);
})();
</script>
</body>
</html>
"##;

/// Fill the page template with the configured quick actions and storefront.
pub fn render_page(config: &WidgetConfig) -> String {
    INDEX_HTML
        .replace(QUICK_ACTIONS_SLOT, &render_quick_actions(&config.quick_actions))
        .replace(STOREFRONT_SLOT, &escape_html(&config.storefront_url))
}

/// GET /
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&state.widget))
}
