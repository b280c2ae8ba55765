//! IRC numeric replies (RFC 1459 / RFC 2812).
//!
//! Every numeric carries a printf-style template. [`Numeric::render`] fills
//! it with the supported subset of conversions: `%s`, `%c`, `%d`, `%-Ns`
//! (left-aligned to width N) and `%%`.

use std::fmt::{self, Display, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Numeric {
    RplWelcome = 1,
    RplYourHost = 2,
    RplCreated = 3,
    RplMyInfo = 4,
    RplBounce = 5,
    RplAway = 301,
    RplUserhost = 302,
    RplIson = 303,
    RplUnaway = 305,
    RplNowAway = 306,
    RplWhoisUser = 311,
    RplWhoisServer = 312,
    RplWhoisOperator = 313,
    RplWhowasUser = 314,
    RplEndOfWho = 315,
    RplWhoisIdle = 317,
    RplEndOfWhois = 318,
    RplWhoisChannels = 319,
    RplListStart = 321,
    RplList = 322,
    RplListEnd = 323,
    RplChannelModeIs = 324,
    RplNoTopic = 331,
    RplTopic = 332,
    RplInviting = 341,
    RplSummoning = 342,
    RplVersion = 351,
    RplWhoReply = 352,
    RplNamesReply = 353,
    RplLinks = 364,
    RplEndOfLinks = 365,
    RplEndOfNames = 366,
    RplBanList = 367,
    RplEndOfBanList = 368,
    RplEndOfWhowas = 369,
    RplInfo = 371,
    RplMotd = 372,
    RplEndOfInfo = 374,
    RplMotdStart = 375,
    RplEndOfMotd = 376,
    RplYouAreOper = 381,
    RplRehashing = 382,
    RplTime = 391,
    RplUsersStart = 392,
    RplUsers = 393,
    RplEndOfUsers = 394,
    RplNoUsers = 395,

    ErrNoSuchNick = 401,
    ErrNoSuchServer = 402,
    ErrNoSuchChannel = 403,
    /// Also sent when Showdown's moderated chat or chat filter rejects a
    /// message.
    ErrCannotSendToChan = 404,
    ErrTooManyChannels = 405,
    ErrWasNoSuchNick = 406,
    ErrTooManyTargets = 407,
    ErrNoOrigin = 409,
    ErrNoRecipient = 411,
    ErrNoTextToSend = 412,
    ErrNoTopLevel = 413,
    ErrWildTopLevel = 414,
    ErrUnknownCommand = 421,
    ErrNoMotd = 422,
    ErrNoAdminInfo = 423,
    ErrFileError = 424,
    ErrNoNicknameGiven = 431,
    /// Used for names the server rejects, such as names starting with
    /// "Guest".
    ErrErroneusNickname = 432,
    ErrNicknameInUse = 433,
    ErrNickCollision = 436,
    ErrUserNotInChannel = 441,
    ErrNotOnChannel = 442,
    ErrUserOnChannel = 443,
    ErrNoLogin = 444,
    ErrSummonDisabled = 445,
    ErrUsersDisabled = 446,
    ErrNotRegistered = 451,
    ErrNeedMoreParams = 461,
    ErrAlreadyRegistered = 462,
    ErrNoPermForHost = 463,
    ErrPasswdMismatch = 464,
    /// Showdown's global ban.
    ErrYouAreBannedCreep = 465,
    ErrKeySet = 467,
    ErrChannelIsFull = 471,
    ErrUnknownMode = 472,
    ErrInviteOnlyChan = 473,
    ErrBannedFromChan = 474,
    ErrBadChannelKey = 475,
    /// There is no IRC operator status on the gateway.
    ErrNoPrivileges = 481,
    ErrChanOpPrivIsNeeded = 482,
    ErrCannotKillServer = 483,
    ErrNoOperHost = 491,
    ErrUmodeUnknownFlag = 501,
    ErrUsersDoNotMatch = 502,
}

impl Numeric {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn template(self) -> &'static str {
        match self {
            Self::RplWelcome => ":%s",
            Self::RplYourHost => ":Your host is %s, running version %s",
            Self::RplCreated => ":This server was created %s",
            Self::RplMyInfo => "%s %s %s %s",
            Self::RplBounce => "%s",
            Self::RplAway => "%s :%s",
            Self::RplUserhost => ":%s",
            Self::RplIson => ":%s",
            Self::RplUnaway => ":You are no longer marked as being away",
            Self::RplNowAway => ":You have been marked as being away",
            Self::RplWhoisUser => "%s %s %s * :%s",
            Self::RplWhoisServer => "%s %s :%s",
            Self::RplWhoisOperator => "%s :is an IRC operator",
            Self::RplWhowasUser => "%s %s %s * :%s",
            Self::RplEndOfWho => "%s :End of /WHO list",
            Self::RplWhoisIdle => "%s %d :seconds idle",
            Self::RplEndOfWhois => "%s :End of /WHOIS list",
            Self::RplWhoisChannels => "%s :%s",
            Self::RplListStart => "Channel :Users  Name",
            Self::RplList => "%s %d :%s",
            Self::RplListEnd => ":End of /LIST",
            Self::RplChannelModeIs => "%s %s %s",
            Self::RplNoTopic => "%s :No topic is set",
            Self::RplTopic => "%s :%s",
            Self::RplInviting => "%s %s",
            Self::RplSummoning => "%s :Summoning user to IRC",
            Self::RplVersion => "%s.%s %s :%s",
            Self::RplWhoReply => "%s %s %s %s %s %c%s :%d %s",
            Self::RplNamesReply => "%c %s :%s",
            Self::RplLinks => "%s %s :%d %s",
            Self::RplEndOfLinks => "%s :End of /LINKS list",
            Self::RplEndOfNames => "%s :End of /NAMES list",
            Self::RplBanList => "%s %s",
            Self::RplEndOfBanList => "%s :End of channel ban list",
            Self::RplEndOfWhowas => "%s :End of WHOWAS",
            Self::RplInfo => ":%s",
            Self::RplMotd => ":- %s",
            Self::RplEndOfInfo => ":End of /INFO list",
            Self::RplMotdStart => ":- %s Message of the day - ",
            Self::RplEndOfMotd => ":End of /MOTD command",
            Self::RplYouAreOper => ":You are now an IRC operator",
            Self::RplRehashing => "%s :Rehashing",
            Self::RplTime => "%s :%s",
            Self::RplUsersStart => ":UserID   Terminal  Host",
            Self::RplUsers => ":%-8s %-9s %-8s",
            Self::RplEndOfUsers => ":End of users",
            Self::RplNoUsers => ":Nobody logged in",

            Self::ErrNoSuchNick => "%s :No such nick/channel",
            Self::ErrNoSuchServer => "%s :No such server",
            Self::ErrNoSuchChannel => "%s :No such channel",
            Self::ErrCannotSendToChan => "%s :Cannot send to channel",
            Self::ErrTooManyChannels => "%s :You have joined too many channels",
            Self::ErrWasNoSuchNick => "%s :There was no such nickname",
            Self::ErrTooManyTargets => "%s :Duplicate recipients. No message delivered",
            Self::ErrNoOrigin => ":No origin specified",
            Self::ErrNoRecipient => ":No recipient given (%s)",
            Self::ErrNoTextToSend => ":No text to send",
            Self::ErrNoTopLevel => "%s :No toplevel domain specified",
            Self::ErrWildTopLevel => "%s :Wildcard in toplevel domain",
            Self::ErrUnknownCommand => "%s :Unknown command",
            Self::ErrNoMotd => ":MOTD File is missing",
            Self::ErrNoAdminInfo => "%s :No administrative info available",
            Self::ErrFileError => ":File error doing %s on %s",
            Self::ErrNoNicknameGiven => ":No nickname given",
            Self::ErrErroneusNickname => "%s :Erroneus nickname",
            Self::ErrNicknameInUse => "%s :Nickname is already in use",
            Self::ErrNickCollision => "%s :Nickname collision KILL",
            Self::ErrUserNotInChannel => "%s %s :They aren't on that channel",
            Self::ErrNotOnChannel => "%s :You're not on that channel",
            Self::ErrUserOnChannel => "%s %s :is already on channel",
            Self::ErrNoLogin => "%s :User not logged in",
            Self::ErrSummonDisabled => ":SUMMON has been disabled",
            Self::ErrUsersDisabled => ":USERS has been disabled",
            Self::ErrNotRegistered => ":You have not registered",
            Self::ErrNeedMoreParams => "%s :Not enough parameters",
            Self::ErrAlreadyRegistered => ":You may not reregister",
            Self::ErrNoPermForHost => ":Your host isn't among the privileged",
            Self::ErrPasswdMismatch => ":Password incorrect",
            Self::ErrYouAreBannedCreep => ":You are banned from this server",
            Self::ErrKeySet => "%s :Channel key already set",
            Self::ErrChannelIsFull => "%s :Cannot join channel (+l)",
            Self::ErrUnknownMode => "%s :is unknown mode char to me",
            Self::ErrInviteOnlyChan => "%s :Cannot join channel (+i)",
            Self::ErrBannedFromChan => "%s :Cannot join channel (+b)",
            Self::ErrBadChannelKey => "%s :Cannot join channel (+k)",
            Self::ErrNoPrivileges => ":Permission Denied- You're not an IRC operator",
            Self::ErrChanOpPrivIsNeeded => "%s :You're not channel operator",
            Self::ErrCannotKillServer => ":You cant kill a server!",
            Self::ErrNoOperHost => ":No O-lines for your host",
            Self::ErrUmodeUnknownFlag => ":Unknown MODE flag",
            Self::ErrUsersDoNotMatch => ":Cant change mode for other users",
        }
    }

    /// Fill the template. Missing arguments render as empty strings and
    /// surplus arguments are ignored.
    pub fn render(self, args: &[&dyn Display]) -> String {
        let mut out = String::new();
        let mut args = args.iter();
        let mut chars = self.template().chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }

            let left_align = chars.next_if_eq(&'-').is_some();
            let mut width = 0usize;
            while let Some(digit) = chars.peek().and_then(|d| d.to_digit(10)) {
                width = width * 10 + digit as usize;
                chars.next();
            }

            match chars.next() {
                Some('%') => out.push('%'),
                Some('s' | 'c' | 'd') => {
                    let value = args.next().map(|arg| arg.to_string()).unwrap_or_default();
                    let _ = if left_align {
                        write!(out, "{:<width$}", value, width = width)
                    } else {
                        write!(out, "{:>width$}", value, width = width)
                    };
                }
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }

        out
    }
}

impl Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}
