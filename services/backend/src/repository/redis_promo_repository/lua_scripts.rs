//! Redis Lua scripts for atomic operations
//!
//! Redis runs a script to completion before serving any other command, so each
//! script below is the store's transaction. Scripts only touch keys passed in
//! `KEYS`; every key name comes from `keys.rs`.

/// Lua script to check a code's rules and record one redemption
///
/// Keys: [code_key, devices_key, redemptions_key, redemption_key]
/// Args: [device_id, now_ms, redemption_id, promo_code_id]
///
/// The caller resolves the code's id and reserves the redemption id first so
/// that every key the script writes is declared up front. A reserved id is
/// simply skipped when the redemption is rejected.
///
/// Returns: ['ok'] on success, otherwise a single-element array holding one of
/// 'invalid_code', 'expired', 'already_redeemed', 'max_redemptions'.
/// Rejections write nothing.
pub const REDEEM_SCRIPT: &str = r#"
local code_key = KEYS[1]
local devices_key = KEYS[2]
local redemptions_key = KEYS[3]
local redemption_key = KEYS[4]
local device_id = ARGV[1]
local now_ms = tonumber(ARGV[2])
local redemption_id = ARGV[3]
local promo_code_id = ARGV[4]

local fields = redis.call('HMGET', code_key, 'id', 'expires_at_ms', 'max_redemptions', 'redemptions_used')
if not fields[1] or fields[1] ~= promo_code_id then
  return { 'invalid_code' }
end
local expires_at_ms = fields[2]
local max_redemptions = tonumber(fields[3])
local redemptions_used = tonumber(fields[4])

-- Same precedence as check_redeemable: expiry, device, capacity.
if expires_at_ms and expires_at_ms ~= '' and tonumber(expires_at_ms) <= now_ms then
  return { 'expired' }
end

if redis.call('SISMEMBER', devices_key, device_id) == 1 then
  return { 'already_redeemed' }
end

if redemptions_used >= max_redemptions then
  return { 'max_redemptions' }
end

redis.call('HSET', redemption_key,
  'id', redemption_id,
  'promo_code_id', promo_code_id,
  'device_id', device_id,
  'redeemed_at_ms', ARGV[2]
)
redis.call('SADD', devices_key, device_id)
redis.call('RPUSH', redemptions_key, redemption_id)
redis.call('HINCRBY', code_key, 'redemptions_used', 1)

return { 'ok' }
"#;

/// Lua script to insert a batch of codes all-or-nothing
///
/// Keys: [code_sequence, code_key_1, ..., code_key_n]
/// Args: [bonus_questions, max_redemptions, expires_at_ms, notes, code_1, ..., code_n]
///
/// `expires_at_ms` and `notes` are empty strings when absent.
///
/// Returns: ['ok'] when every code was written, or ['collided', code...] listing
/// the codes that already exist or repeat earlier in the batch, in which case
/// nothing was written.
pub const INSERT_BATCH_SCRIPT: &str = r#"
local code_seq = KEYS[1]
local bonus_questions = ARGV[1]
local max_redemptions = ARGV[2]
local expires_at_ms = ARGV[3]
local notes = ARGV[4]

-- A key repeated within the batch collides with its own first copy.
local collided = {}
local seen = {}
for i = 2, #KEYS do
  if seen[KEYS[i]] or redis.call('EXISTS', KEYS[i]) == 1 then
    table.insert(collided, ARGV[i + 3])
  end
  seen[KEYS[i]] = true
end

if #collided > 0 then
  local reply = { 'collided' }
  for _, code in ipairs(collided) do
    table.insert(reply, code)
  end
  return reply
end

for i = 2, #KEYS do
  local id = redis.call('INCR', code_seq)
  redis.call('HSET', KEYS[i],
    'id', tostring(id),
    'code', ARGV[i + 3],
    'bonus_questions', bonus_questions,
    'expires_at_ms', expires_at_ms,
    'max_redemptions', max_redemptions,
    'redemptions_used', '0',
    'notes', notes
  )
end

return { 'ok' }
"#;
