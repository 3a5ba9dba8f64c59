/*
 * Definitions for the TELNET protocol.
 */
pub const IAC: u8 = 255; /* interpret as command */
pub const DONT: u8 = 254; /* you are not to use option */
pub const DO: u8 = 253; /* please, you use option */
pub const WONT: u8 = 252; /* I won't use option */
pub const WILL: u8 = 251; /* I will use option */
pub const SB: u8 = 250; /* interpret as subnegotiation */
pub const GA: u8 = 249; /* you may reverse the line */
pub const NOP: u8 = 241; /* nop */
pub const SE: u8 = 240; /* end sub negotiation */

/* telnet options */
pub const TELOPT_ECHO: u8 = 1; /* echo */
pub const TELOPT_SGA: u8 = 3; /* suppress go ahead */
pub const TELOPT_NAWS: u8 = 31; /* window size */

/* MUD client compression protocol, versions 1 and 2 */
pub const TELOPT_COMPRESS: u8 = 85;
pub const TELOPT_COMPRESS2: u8 = 86;

/* offered to every new connection; whichever the client acks first wins */
pub const COMPRESS_WILL: [u8; 3] = [IAC, WILL, TELOPT_COMPRESS];
pub const COMPRESS_WILL2: [u8; 3] = [IAC, WILL, TELOPT_COMPRESS2];
